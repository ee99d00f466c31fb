//! LP model handed to the solver backends.
//!
//! Every period is an independent block:
//!
//! ```text
//! maximize   Σ_t discount_t · Σ_i c_i · r_i^t
//! subject to Σ_i r_i^t ≤ capacity            (per period)
//!            lower_i^t ≤ r_i^t ≤ upper_i^t
//! ```
//!
//! Demand is encoded as `upper`, the hard SLA as `lower` (capped by demand).

use crate::client::Client;
use crate::config::ObjectiveMode;

/// Absolute tolerance for bound, capacity and dual checks.
pub const TOLERANCE: f64 = 1e-6;

/// One client's variable in one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lane {
    pub coefficient: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Lane {
    pub fn new(coefficient: f64, lower: f64, upper: f64) -> Self {
        Self {
            coefficient,
            lower,
            upper,
        }
    }

    /// Build the lane for a client given the demand expected in that period.
    pub fn for_client(client: &Client, mode: ObjectiveMode, demand: f64) -> Self {
        let coefficient = match mode {
            ObjectiveMode::Throughput => client.weight,
            ObjectiveMode::Revenue => client.willingness_to_pay.unwrap_or(0.0),
        };
        Self::new(coefficient, client.min_rate().min(demand), demand)
    }
}

/// A single capacity block.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodProblem {
    pub discount: f64,
    pub capacity: f64,
    pub lanes: Vec<Lane>,
}

impl PeriodProblem {
    /// Undiscounted objective of `rates` in this period.
    pub fn objective(&self, rates: &[f64]) -> f64 {
        self.lanes
            .iter()
            .zip(rates)
            .map(|(lane, rate)| lane.coefficient * rate)
            .sum()
    }

    pub fn min_load(&self) -> f64 {
        self.lanes.iter().map(|l| l.lower).sum()
    }

    /// Whether `rates` respects every bound and the capacity row.
    pub fn is_feasible(&self, rates: &[f64]) -> bool {
        if rates.len() != self.lanes.len() {
            return false;
        }
        let within_bounds = self
            .lanes
            .iter()
            .zip(rates)
            .all(|(lane, &r)| r >= lane.lower - TOLERANCE && r <= lane.upper + TOLERANCE);
        within_bounds && rates.iter().sum::<f64>() <= self.capacity + TOLERANCE
    }

    /// Dual value of the capacity row at the primal point `rates`.
    ///
    /// With the capacity row slack the price is zero. Otherwise complementary
    /// slackness forces `π ≥ c_i` for every lane still below its upper bound,
    /// and the smallest such price is reported.
    pub fn capacity_dual(&self, rates: &[f64]) -> f64 {
        let load: f64 = rates.iter().sum();
        if load < self.capacity - TOLERANCE {
            return 0.0;
        }
        self.lanes
            .iter()
            .zip(rates)
            .filter(|(lane, r)| **r < lane.upper - TOLERANCE)
            .map(|(lane, _)| lane.coefficient)
            .fold(0.0, f64::max)
    }

    /// Check dual feasibility of `rates` for the price `price`.
    ///
    /// Lanes above their lower bound need `c_i ≥ π`; lanes below their upper
    /// bound need `c_i ≤ π`.
    pub fn is_dual_feasible(&self, rates: &[f64], price: f64) -> bool {
        self.lanes.iter().zip(rates).all(|(lane, &r)| {
            let above_lower = r > lane.lower + TOLERANCE;
            let below_upper = r < lane.upper - TOLERANCE;
            (!above_lower || lane.coefficient >= price - TOLERANCE)
                && (!below_upper || lane.coefficient <= price + TOLERANCE)
        })
    }

    /// Pull values that drifted past a bound by solver round-off back onto it.
    pub fn snap(&self, rates: &mut [f64]) {
        for (lane, rate) in self.lanes.iter().zip(rates.iter_mut()) {
            *rate = rate.clamp(lane.lower, lane.upper);
        }
    }
}

/// The full LP across all horizon periods, client order preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationProblem {
    pub periods: Vec<PeriodProblem>,
}

impl AllocationProblem {
    /// Single-period problem over the current demand.
    pub fn single_period(clients: &[Client], mode: ObjectiveMode, capacity: f64) -> Self {
        let lanes = clients
            .iter()
            .map(|c| Lane::for_client(c, mode, c.demand))
            .collect();
        Self {
            periods: vec![PeriodProblem {
                discount: 1.0,
                capacity,
                lanes,
            }],
        }
    }

    pub fn num_clients(&self) -> usize {
        self.periods.first().map_or(0, |p| p.lanes.len())
    }

    pub fn is_empty(&self) -> bool {
        self.num_clients() == 0
    }

    /// Discounted objective of a full set of per-period rates.
    pub fn objective(&self, rates: &[Vec<f64>]) -> f64 {
        self.periods
            .iter()
            .zip(rates)
            .map(|(period, r)| period.discount * period.objective(r))
            .sum()
    }
}

/// Optimal rates per period (client order) and the discounted objective.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub rates: Vec<Vec<f64>>,
    pub objective: f64,
}

impl SolveOutcome {
    /// The zero allocation for a problem without clients.
    pub fn empty(problem: &AllocationProblem) -> Self {
        Self {
            rates: vec![Vec::new(); problem.periods.len()],
            objective: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_lane_period() -> PeriodProblem {
        PeriodProblem {
            discount: 1.0,
            capacity: 100.0,
            lanes: vec![Lane::new(2.0, 0.0, 60.0), Lane::new(1.0, 0.0, 60.0)],
        }
    }

    #[test]
    fn dual_is_marginal_coefficient_when_binding() {
        let period = two_lane_period();
        let rates = [60.0, 40.0];
        assert!(period.is_feasible(&rates));
        assert_eq!(period.capacity_dual(&rates), 1.0);
        assert!(period.is_dual_feasible(&rates, 1.0));
    }

    #[test]
    fn dual_is_zero_when_capacity_slack() {
        let period = PeriodProblem {
            capacity: 500.0,
            ..two_lane_period()
        };
        let rates = [60.0, 60.0];
        assert_eq!(period.capacity_dual(&rates), 0.0);
        assert!(period.is_dual_feasible(&rates, 0.0));
    }

    #[test]
    fn suboptimal_point_fails_dual_check() {
        let period = two_lane_period();
        let rates = [40.0, 60.0];
        let price = period.capacity_dual(&rates);
        assert!(!period.is_dual_feasible(&rates, price));
    }

    #[test]
    fn lane_caps_minimum_by_demand() {
        let client = Client::new("a", 10.0, 1.0).with_min_rate(30.0);
        let lane = Lane::for_client(&client, ObjectiveMode::Throughput, client.demand);
        assert_eq!(lane, Lane::new(1.0, 10.0, 10.0));
    }

    #[test]
    fn revenue_mode_uses_willingness_to_pay() {
        let priced = Client::new("a", 10.0, 5.0).with_willingness_to_pay(0.2);
        let unpriced = Client::new("b", 10.0, 5.0);
        assert_eq!(
            Lane::for_client(&priced, ObjectiveMode::Revenue, 10.0).coefficient,
            0.2
        );
        assert_eq!(
            Lane::for_client(&unpriced, ObjectiveMode::Revenue, 10.0).coefficient,
            0.0
        );
    }

    #[test]
    fn snap_clamps_round_off() {
        let period = two_lane_period();
        let mut rates = [60.000_000_1, -1e-9];
        period.snap(&mut rates);
        assert_eq!(rates, [60.0, 0.0]);
    }
}

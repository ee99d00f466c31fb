//! Reuse of the previous allocation as a starting point.
//!
//! The hint is aligned to the current client list and then certified: a
//! point that is primal feasible and dual feasible for the new problem is
//! optimal, so it is returned without touching the backend. Anything else
//! falls through to a cold solve, which keeps the optimal value independent
//! of the hint.

use crate::client::Client;
use crate::problem::{AllocationProblem, SolveOutcome};
use crate::solution::Solution;

/// Previous rates laid out in the current client order.
#[derive(Debug, Clone, PartialEq)]
pub struct WarmStart {
    rates: Vec<f64>,
    carried: usize,
    dropped: usize,
}

impl WarmStart {
    /// Align `previous` to `clients`. New clients start at zero, removed ones are dropped.
    pub fn align(previous: &Solution, clients: &[Client]) -> Self {
        let rates: Vec<f64> = clients
            .iter()
            .map(|c| previous.allocations.get(&c.id).copied().unwrap_or(0.0))
            .collect();
        let carried = clients
            .iter()
            .filter(|c| previous.allocations.contains_key(&c.id))
            .count();
        let dropped = previous.allocations.len() - carried;

        Self {
            rates,
            carried,
            dropped,
        }
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    /// Clients whose previous rate was carried over.
    pub fn carried(&self) -> usize {
        self.carried
    }

    /// Previous allocations that no longer have a client.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Return the hint as the optimum if it provably is one.
    ///
    /// Only single-period problems are certified; look-ahead periods carry no
    /// previous values.
    pub fn certify(&self, problem: &AllocationProblem) -> Option<SolveOutcome> {
        let [period] = problem.periods.as_slice() else {
            return None;
        };
        if !period.is_feasible(&self.rates) {
            return None;
        }
        let price = period.capacity_dual(&self.rates);
        if !period.is_dual_feasible(&self.rates, price) {
            return None;
        }

        let mut rates = self.rates.clone();
        period.snap(&mut rates);
        let objective = period.discount * period.objective(&rates);
        Some(SolveOutcome {
            rates: vec![rates],
            objective,
        })
    }
}

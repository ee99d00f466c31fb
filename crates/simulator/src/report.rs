//! End-of-run summary of a simulation.

use allocator::evaluate_fairness;
use allocator::Client;
use allocator::ControllerStats;
use allocator::Solution;
use serde::Serialize;

use crate::workload::Pattern;
use crate::workload::WorkloadStats;

/// Price floor of the posted-price admission model.
pub const MIN_PRICE: f64 = 0.01;

/// Running mean and population std; non-finite samples are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
struct Moments {
    sum: f64,
    sum_sq: f64,
    count: u64,
}

impl Moments {
    fn push(&mut self, value: f64) {
        if value.is_finite() {
            self.sum += value;
            self.sum_sq += value * value;
            self.count += 1;
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    fn std(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_sq / self.count as f64 - mean * mean).max(0.0).sqrt()
    }
}

/// Revenue of one tick under posted pricing at `max(price, MIN_PRICE)`.
///
/// A client pays for its served rate when its willingness to pay covers the
/// posted price; clients without a declared willingness never pay.
pub fn posted_price_revenue(clients: &[Client], solution: &Solution, price: f64) -> f64 {
    let posted = price.max(MIN_PRICE);
    clients
        .iter()
        .filter(|c| c.willingness_to_pay.is_some_and(|wtp| wtp >= posted))
        .map(|c| posted * served(c, solution))
        .sum()
}

fn served(client: &Client, solution: &Solution) -> f64 {
    solution.rate(&client.id).unwrap_or(0.0).min(client.demand)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub pattern: Pattern,
    pub ticks: u64,
    /// Ticks rejected because the hard minimums did not fit.
    pub infeasible_ticks: u64,
    pub skip_rate: f64,
    pub price_volatility: f64,
    pub mean_solve_time_us: f64,
    pub mean_shadow_price: f64,
    /// Population std of the shadow prices of all solves.
    pub shadow_price_std: f64,
    pub max_shadow_price: f64,
    pub mean_smoothed_price: f64,
    /// Population std of the published price over all ticks.
    pub smoothed_price_std: f64,
    /// Mean of `min(allocated, demand) / demand` over client ticks.
    pub acceptance_rate: f64,
    /// Share of hard-minimum checks that were met; infeasible ticks count as misses.
    pub sla_compliance_rate: f64,
    pub total_revenue: f64,
    pub mean_jains_index: f64,
    pub mean_gini_coefficient: f64,
    pub mean_utilization: f64,
    pub controller: ControllerStats,
    pub workload: WorkloadStats,

    #[serde(skip)]
    priced: bool,
    #[serde(skip)]
    solve_time: Moments,
    #[serde(skip)]
    shadow_price: Moments,
    #[serde(skip)]
    smoothed_price: Moments,
    #[serde(skip)]
    acceptance: Moments,
    #[serde(skip)]
    sla_checks: u64,
    #[serde(skip)]
    sla_violations: u64,
    #[serde(skip)]
    jains: Moments,
    #[serde(skip)]
    gini: Moments,
    #[serde(skip)]
    utilization: Moments,
}

impl SimulationSummary {
    pub fn new(workload: WorkloadStats) -> Self {
        Self {
            pattern: workload.pattern,
            ticks: 0,
            infeasible_ticks: 0,
            skip_rate: 0.0,
            price_volatility: 0.0,
            mean_solve_time_us: 0.0,
            mean_shadow_price: 0.0,
            shadow_price_std: 0.0,
            max_shadow_price: 0.0,
            mean_smoothed_price: 0.0,
            smoothed_price_std: 0.0,
            acceptance_rate: 0.0,
            sla_compliance_rate: 1.0,
            total_revenue: 0.0,
            mean_jains_index: 0.0,
            mean_gini_coefficient: 0.0,
            mean_utilization: 0.0,
            controller: ControllerStats::default(),
            workload,
            priced: true,
            solve_time: Moments::default(),
            shadow_price: Moments::default(),
            smoothed_price: Moments::default(),
            acceptance: Moments::default(),
            sla_checks: 0,
            sla_violations: 0,
            jains: Moments::default(),
            gini: Moments::default(),
            utilization: Moments::default(),
        }
    }

    /// Skip revenue accounting, for allocators that publish no price.
    pub fn without_pricing(mut self) -> Self {
        self.priced = false;
        self
    }

    /// Account one tick answered with `solution`; `solved` is false on cache reuse.
    pub fn record(&mut self, clients: &[Client], solution: &Solution, solved: bool) {
        self.ticks += 1;
        if solved {
            self.solve_time.push(solution.solve_time.as_secs_f64() * 1e6);
            self.shadow_price.push(solution.shadow_price);
            if solution.shadow_price.is_finite() {
                self.max_shadow_price = self.max_shadow_price.max(solution.shadow_price);
            }
        }
        self.smoothed_price.push(solution.smoothed_price);
        self.utilization.push(solution.utilization());

        for client in clients {
            let allocated = solution.rate(&client.id).unwrap_or(0.0);
            let acceptance = if client.demand > 0.0 {
                served(client, solution) / client.demand
            } else {
                1.0
            };
            self.acceptance.push(acceptance);
            if client.min_rate() > 0.0 {
                self.sla_checks += 1;
                if allocated + allocator::TOLERANCE < client.min_rate().min(client.demand) {
                    self.sla_violations += 1;
                }
            }
        }
        if self.priced {
            self.total_revenue += posted_price_revenue(clients, solution, solution.smoothed_price);
        }

        let fairness = evaluate_fairness(clients, solution);
        self.jains.push(fairness.jains_index);
        self.gini.push(fairness.gini_coefficient);
    }

    /// Account a tick whose hard minimums could not be met.
    pub fn record_infeasible(&mut self, clients: &[Client]) {
        self.ticks += 1;
        self.infeasible_ticks += 1;
        let sla_clients = clients.iter().filter(|c| c.min_rate() > 0.0).count() as u64;
        self.sla_checks += sla_clients;
        self.sla_violations += sla_clients;
    }

    /// Fold the running means and the controller counters into the summary.
    pub fn finish(mut self, stats: &ControllerStats) -> Self {
        self.skip_rate = stats.skip_rate();
        self.price_volatility = stats.price_volatility();
        self.mean_solve_time_us = self.solve_time.mean();
        self.mean_shadow_price = self.shadow_price.mean();
        self.shadow_price_std = self.shadow_price.std();
        self.mean_smoothed_price = self.smoothed_price.mean();
        self.smoothed_price_std = self.smoothed_price.std();
        self.acceptance_rate = self.acceptance.mean();
        self.sla_compliance_rate = if self.sla_checks == 0 {
            1.0
        } else {
            1.0 - self.sla_violations as f64 / self.sla_checks as f64
        };
        self.mean_jains_index = self.jains.mean();
        self.mean_gini_coefficient = self.gini.mean();
        self.mean_utilization = self.utilization.mean();
        self.controller = stats.clone();
        self
    }
}

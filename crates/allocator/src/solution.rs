use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::buffer::CapacityState;
use crate::trigger::ResolveReason;

/// Outcome of one solve. Immutable once produced; the controller hands it out
/// as `Arc<Solution>` and replaces it wholesale on the next solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    /// Sequence number of the solve that produced this solution.
    pub period: u64,
    /// The `now` passed to the tick that solved; not refreshed on reuse.
    pub timestamp: f64,
    /// Applied (period-1) rate per client id.
    pub allocations: BTreeMap<String, f64>,
    /// Dual value of the period-1 capacity row.
    pub shadow_price: f64,
    /// EMA of shadow prices, the value meant for publication.
    pub smoothed_price: f64,
    /// Discounted objective over the whole horizon.
    pub objective_value: f64,
    /// Dual values of the look-ahead capacity rows (periods 2..T).
    pub horizon_prices: Vec<f64>,
    pub capacity: CapacityState,
    pub reason: ResolveReason,
    /// True when the previous allocation was certified optimal and reused.
    pub warm_started: bool,
    pub solve_time: Duration,
}

impl Solution {
    pub fn rate(&self, client_id: &str) -> Option<f64> {
        self.allocations.get(client_id).copied()
    }

    pub fn total_allocated(&self) -> f64 {
        self.allocations.values().sum()
    }

    /// Share of the effective capacity in use, 0 when there is none.
    pub fn utilization(&self) -> f64 {
        if self.capacity.effective > 0.0 {
            self.total_allocated() / self.capacity.effective
        } else {
            0.0
        }
    }
}

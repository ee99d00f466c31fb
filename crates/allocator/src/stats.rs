use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use crate::trigger::ResolveReason;

/// Raw shadow prices kept for the volatility figure.
const PRICE_WINDOW: usize = 20;

/// Running counters of one controller instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStats {
    pub solves: u64,
    /// Ticks answered from the cached solution.
    pub skipped: u64,
    pub by_reason: BTreeMap<ResolveReason, u64>,
    /// Solves where the previous allocation was certified and the backend skipped.
    pub warm_start_hits: u64,
    pub infeasible: u64,
    pub solver_failures: u64,
    /// Solver failures answered with the cached solution.
    pub stale_fallbacks: u64,
    #[serde(skip)]
    recent_prices: VecDeque<f64>,
}

impl ControllerStats {
    pub(crate) fn record_solve(&mut self, reason: ResolveReason, warm_started: bool, price: f64) {
        self.solves += 1;
        *self.by_reason.entry(reason).or_insert(0) += 1;
        if warm_started {
            self.warm_start_hits += 1;
        }
        if self.recent_prices.len() == PRICE_WINDOW {
            self.recent_prices.pop_front();
        }
        self.recent_prices.push_back(price);
    }

    pub fn solves_for(&self, reason: ResolveReason) -> u64 {
        self.by_reason.get(&reason).copied().unwrap_or(0)
    }

    /// Share of ticks that reused the cached solution.
    pub fn skip_rate(&self) -> f64 {
        let ticks = self.solves + self.skipped;
        if ticks == 0 {
            0.0
        } else {
            self.skipped as f64 / ticks as f64
        }
    }

    /// Population std of the most recent raw shadow prices.
    pub fn price_volatility(&self) -> f64 {
        let n = self.recent_prices.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.recent_prices.iter().sum::<f64>() / n as f64;
        let var = self
            .recent_prices
            .iter()
            .map(|p| (p - mean).powi(2))
            .sum::<f64>()
            / n as f64;
        var.sqrt()
    }

    pub fn recent_prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.recent_prices.iter().copied()
    }
}

//! Side-by-side runs of the controller against simpler allocators.

use std::collections::BTreeMap;
use std::time::Duration;

use allocator::CapacityState;
use allocator::Client;
use allocator::ControllerConfig;
use allocator::HorizonConfig;
use allocator::ResolveReason;
use allocator::Solution;
use serde::Serialize;

use crate::report::SimulationSummary;
use crate::workload::Pattern;
use crate::workload::WorkloadStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Fixed quotas computed once from the first tick.
    StaticTokenBucket,
    /// Cold LP solve every tick, no buffer, horizon or smoothing.
    BasicLp,
    /// The configured controller.
    Controller,
}

/// Quotas fixed at the first tick: clients with a hard minimum get it, the
/// rest share what is left equally. Clients first seen later get nothing.
#[derive(Debug, Clone)]
pub struct StaticTokenBucket {
    capacity: f64,
    quotas: Option<BTreeMap<String, f64>>,
}

impl StaticTokenBucket {
    pub fn new(capacity: f64) -> Self {
        Self {
            capacity,
            quotas: None,
        }
    }

    pub fn quotas(&self) -> Option<&BTreeMap<String, f64>> {
        self.quotas.as_ref()
    }

    fn compute_quotas(&self, clients: &[Client]) -> BTreeMap<String, f64> {
        let mut quotas = BTreeMap::new();
        let mut remaining = self.capacity;
        for client in clients.iter().filter(|c| c.min_rate() > 0.0) {
            let quota = client.min_rate().min(remaining.max(0.0));
            remaining -= quota;
            quotas.insert(client.id.clone(), quota);
        }

        let others: Vec<&Client> = clients.iter().filter(|c| c.min_rate() <= 0.0).collect();
        let share = if others.is_empty() {
            0.0
        } else {
            remaining.max(0.0) / others.len() as f64
        };
        for client in others {
            quotas.insert(client.id.clone(), share);
        }
        quotas
    }

    /// Admitted rates for this tick: each client's quota capped at its demand.
    pub fn allocate(&mut self, clients: &[Client], now: f64) -> Solution {
        if self.quotas.is_none() {
            self.quotas = Some(self.compute_quotas(clients));
        }
        let quotas = self.quotas.as_ref();

        let allocations: BTreeMap<String, f64> = clients
            .iter()
            .map(|c| {
                let quota = quotas.and_then(|q| q.get(&c.id)).copied().unwrap_or(0.0);
                (c.id.clone(), quota.min(c.demand))
            })
            .collect();
        let objective_value = clients
            .iter()
            .map(|c| c.weight * allocations.get(&c.id).copied().unwrap_or(0.0))
            .sum();

        Solution {
            period: 0,
            timestamp: now,
            allocations,
            shadow_price: 0.0,
            smoothed_price: 0.0,
            objective_value,
            horizon_prices: Vec::new(),
            capacity: CapacityState::unbuffered(self.capacity),
            reason: ResolveReason::Initial,
            warm_started: false,
            solve_time: Duration::ZERO,
        }
    }
}

/// `cfg` stripped down to a plain per-tick LP.
pub fn basic_config(cfg: &ControllerConfig) -> ControllerConfig {
    let mut basic = cfg.clone();
    basic.warm_start = false;
    basic.horizon = HorizonConfig {
        periods: 1,
        ..cfg.horizon.clone()
    };
    basic.buffer.coefficient = 0.0;
    basic.ema_alpha = 1.0;
    basic
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmResult {
    pub algorithm: Algorithm,
    pub acceptance_rate: f64,
    pub sla_compliance_rate: f64,
    pub mean_utilization: f64,
    pub total_revenue: f64,
    pub mean_jains_index: f64,
    pub mean_gini_coefficient: f64,
    /// Mean and std of the published price per tick.
    pub price_mean: f64,
    pub price_std: f64,
    pub mean_solve_time_us: f64,
    pub solves: u64,
    pub skipped: u64,
    pub infeasible_ticks: u64,
}

impl AlgorithmResult {
    pub fn from_summary(algorithm: Algorithm, summary: &SimulationSummary) -> Self {
        Self {
            algorithm,
            acceptance_rate: summary.acceptance_rate,
            sla_compliance_rate: summary.sla_compliance_rate,
            mean_utilization: summary.mean_utilization,
            total_revenue: summary.total_revenue,
            mean_jains_index: summary.mean_jains_index,
            mean_gini_coefficient: summary.mean_gini_coefficient,
            price_mean: summary.mean_smoothed_price,
            price_std: summary.smoothed_price_std,
            mean_solve_time_us: summary.mean_solve_time_us,
            solves: summary.controller.solves,
            skipped: summary.controller.skipped,
            infeasible_ticks: summary.infeasible_ticks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub pattern: Pattern,
    pub workload: WorkloadStats,
    pub results: Vec<AlgorithmResult>,
}

impl ComparisonReport {
    pub fn result(&self, algorithm: Algorithm) -> Option<&AlgorithmResult> {
        self.results.iter().find(|r| r.algorithm == algorithm)
    }
}

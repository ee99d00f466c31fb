//! Re-solve trigger policy.
//!
//! Decides per tick whether the cached solution is still good enough. The
//! price condition needs a price before solving, so it works on a cheap
//! estimate compared against the estimate recorded at the last solve.

use serde::Serialize;

use crate::client::Client;
use crate::config::{ObjectiveMode, TriggerConfig};
use crate::problem::Lane;

/// Why a solve happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolveReason {
    /// Nothing cached yet.
    Initial,
    /// Caller bypassed the policy.
    Forced,
    /// The cached solution reached the configured age.
    Elapsed,
    /// Aggregate demand moved past the load threshold.
    LoadChange,
    /// Estimated price moved past the price threshold.
    PriceChange,
}

impl ResolveReason {
    pub const ALL: [ResolveReason; 5] = [
        ResolveReason::Initial,
        ResolveReason::Forced,
        ResolveReason::Elapsed,
        ResolveReason::LoadChange,
        ResolveReason::PriceChange,
    ];

    /// Name used in serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolveReason::Initial => "initial",
            ResolveReason::Forced => "forced",
            ResolveReason::Elapsed => "elapsed",
            ResolveReason::LoadChange => "loadChange",
            ResolveReason::PriceChange => "priceChange",
        }
    }
}

/// Snapshot taken at the last solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerState {
    pub last_solve: f64,
    pub last_load: f64,
    pub last_price_estimate: f64,
    pub last_shadow_price: f64,
}

/// Stateless evaluator of the three re-solve conditions.
#[derive(Debug, Clone)]
pub struct TriggerPolicy {
    cfg: TriggerConfig,
}

impl TriggerPolicy {
    pub fn new(cfg: TriggerConfig) -> Self {
        Self { cfg }
    }

    /// Return the first condition that fires, if any.
    pub fn check(
        &self,
        state: Option<&TriggerState>,
        now: f64,
        load: f64,
        price_estimate: f64,
    ) -> Option<ResolveReason> {
        let Some(state) = state else {
            return Some(ResolveReason::Initial);
        };

        // A clock that moved backwards never counts as elapsed.
        let elapsed = now - state.last_solve;
        if elapsed >= self.cfg.resolve_interval {
            return Some(ResolveReason::Elapsed);
        }

        let load_change = relative_change(state.last_load, load);
        if load_change >= self.cfg.load_change {
            return Some(ResolveReason::LoadChange);
        }

        let price_change = relative_change(state.last_price_estimate, price_estimate);
        if price_change >= self.cfg.price_change {
            return Some(ResolveReason::PriceChange);
        }

        tracing::trace!(
            elapsed = elapsed,
            load_change = %format!("{:.1}%", load_change * 100.0),
            price_change = %format!("{:.1}%", price_change * 100.0),
            "No re-solve trigger fired"
        );
        None
    }
}

/// `|current - previous| / |previous|`; from a zero baseline any move is infinite.
pub fn relative_change(previous: f64, current: f64) -> f64 {
    if previous.abs() <= f64::EPSILON {
        if current.abs() <= f64::EPSILON {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        (current - previous).abs() / previous.abs()
    }
}

/// Price estimate without an LP solve.
///
/// Demand-weighted mean objective coefficient times the share of demand that
/// cannot be served: zero while demand fits, rising smoothly with congestion.
pub fn estimate_price(clients: &[Client], mode: ObjectiveMode, capacity: f64) -> f64 {
    let demand: f64 = clients.iter().map(|c| c.demand).sum();
    if demand <= 0.0 || demand <= capacity {
        return 0.0;
    }
    let weighted: f64 = clients
        .iter()
        .map(|c| Lane::for_client(c, mode, c.demand).coefficient * c.demand)
        .sum();
    let shed = 1.0 - capacity.max(0.0) / demand;
    (weighted / demand) * shed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_names_match_serialized_form() {
        for reason in ResolveReason::ALL {
            let json = serde_json::to_value(reason).unwrap();
            assert_eq!(json, reason.as_str());
        }
    }

    fn state() -> TriggerState {
        TriggerState {
            last_solve: 100.0,
            last_load: 100.0,
            last_price_estimate: 1.0,
            last_shadow_price: 1.0,
        }
    }

    fn policy() -> TriggerPolicy {
        TriggerPolicy::new(TriggerConfig::default())
    }

    #[test]
    fn first_tick_always_solves() {
        assert_eq!(
            policy().check(None, 0.0, 0.0, 0.0),
            Some(ResolveReason::Initial)
        );
    }

    #[test]
    fn quiet_tick_reuses_cache() {
        assert_eq!(policy().check(Some(&state()), 105.0, 110.0, 1.2), None);
    }

    #[test]
    fn each_condition_fires_alone() {
        let p = policy();
        let s = state();
        assert_eq!(
            p.check(Some(&s), 110.0, 100.0, 1.0),
            Some(ResolveReason::Elapsed)
        );
        assert_eq!(
            p.check(Some(&s), 101.0, 120.0, 1.0),
            Some(ResolveReason::LoadChange)
        );
        assert_eq!(
            p.check(Some(&s), 101.0, 100.0, 1.3),
            Some(ResolveReason::PriceChange)
        );
    }

    #[test]
    fn backwards_clock_is_not_elapsed() {
        assert_eq!(policy().check(Some(&state()), 50.0, 100.0, 1.0), None);
    }

    #[test]
    fn change_from_zero_baseline() {
        assert_eq!(relative_change(0.0, 0.0), 0.0);
        assert_eq!(relative_change(0.0, 0.5), f64::INFINITY);
        assert_eq!(relative_change(2.0, 1.0), 0.5);
    }

    #[test]
    fn estimate_is_zero_without_congestion() {
        let clients = vec![Client::new("a", 30.0, 2.0), Client::new("b", 30.0, 1.0)];
        assert_eq!(estimate_price(&clients, ObjectiveMode::Throughput, 100.0), 0.0);
    }

    #[test]
    fn estimate_grows_with_congestion() {
        let clients = vec![Client::new("a", 60.0, 2.0), Client::new("b", 60.0, 1.0)];
        let light = estimate_price(&clients, ObjectiveMode::Throughput, 100.0);
        let heavy = estimate_price(&clients, ObjectiveMode::Throughput, 60.0);
        // mean coefficient 1.5, shed 1/6 of 120.
        assert!((light - 0.25).abs() < 1e-12);
        assert!(heavy > light);
    }
}

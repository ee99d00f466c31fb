//! LP-based rate allocation for a shared capacity.
//!
//! Every tick the caller hands the current client list to an
//! [`AllocationController`]. The controller decides via its trigger policy
//! whether the cached [`Solution`] is still usable; if not, it solves
//!
//! ```text
//! maximize   Σ_t γ^(t-1) Σ_i c_i · r_i^t
//! subject to Σ_i r_i^t ≤ C_effective
//!            min(minRate_i, d_i^t) ≤ r_i^t ≤ d_i^t
//! ```
//!
//! and publishes the per-client rates together with the capacity shadow price.
//! The effective capacity is the configured one minus a volatility buffer.

use error_stack::Report;

mod buffer;
mod client;
mod config;
mod controller;
mod error;
mod fairness;
mod horizon;
mod problem;
mod smoothing;
mod solution;
mod solver;
mod stats;
mod trigger;
mod warm_start;

#[cfg(test)]
mod fuzz_tests;

/// Result type using error-stack for context-rich error reporting
pub type Result<T, C> = core::result::Result<T, Report<C>>;

pub use buffer::{CapacityState, DemandHistory, RobustBuffer};
pub use client::{aggregate_demand, total_min_rate, validate_clients, Client};
pub use config::{
    BufferConfig, ControllerConfig, HorizonConfig, ObjectiveMode, SolverKind, TriggerConfig,
};
pub use controller::{AllocationController, SharedController};
pub use error::AllocError;
pub use fairness::{
    allocation_ratio, evaluate_fairness, gini_coefficient, jains_index, FairnessMetrics,
};
pub use horizon::{build_problem, DemandForecaster, NoForecast, PersistenceForecast};
pub use problem::{AllocationProblem, Lane, PeriodProblem, SolveOutcome, TOLERANCE};
pub use smoothing::PriceSmoother;
pub use solution::Solution;
pub use solver::{solver_for, GreedySolver, LpSolver, SimplexSolver};
pub use stats::ControllerStats;
pub use trigger::{estimate_price, relative_change, ResolveReason, TriggerPolicy, TriggerState};
pub use warm_start::WarmStart;

use error_stack::Result;
use serde::{Deserialize, Deserializer, Serialize};

use crate::AllocError;

/// Which coefficient the LP objective multiplies each rate by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveMode {
    /// `Σ weight_i · r_i`
    #[default]
    Throughput,
    /// `Σ willingness_to_pay_i · r_i`
    Revenue,
}

/// Solver backend, chosen once when the controller is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    /// General simplex over the full multi-period LP.
    #[default]
    Simplex,
    /// Closed-form fractional fill, exact for the single-constraint structure.
    Greedy,
}

/// Rolling-horizon look-ahead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HorizonConfig {
    /// Number of periods T, including the applied one.
    pub periods: usize,
    /// Geometric discount γ applied to period t as γ^(t-1).
    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub discount: f64,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            periods: 1,
            discount: 0.8,
        }
    }
}

/// Capacity reserve derived from recent demand volatility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BufferConfig {
    /// Risk-aversion coefficient β; buffer = β · σ.
    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub coefficient: f64,
    /// Trailing window of aggregate-demand samples.
    pub window: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            coefficient: 1.0,
            window: 10,
        }
    }
}

/// Thresholds that decide whether a tick re-solves or reuses the cached solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerConfig {
    /// Maximum age of the cached solution, in the caller's time unit.
    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub resolve_interval: f64,
    /// Relative change of aggregate demand that forces a solve.
    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub load_change: f64,
    /// Relative change of the estimated price that forces a solve.
    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub price_change: f64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            resolve_interval: 10.0,
            load_change: 0.20,
            price_change: 0.30,
        }
    }
}

/// Full controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    /// Total shared capacity C.
    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub capacity: f64,
    pub objective: ObjectiveMode,
    pub solver: SolverKind,
    /// Reuse the previous allocation when it is still provably optimal.
    pub warm_start: bool,
    pub horizon: HorizonConfig,
    pub buffer: BufferConfig,
    pub trigger: TriggerConfig,
    /// EMA factor α for the published price.
    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub ema_alpha: f64,
    /// Return the cached solution when the backend fails instead of erroring.
    pub allow_stale_on_solver_error: bool,
    /// Solves slower than this many seconds are logged as warnings.
    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub solve_time_warning: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            capacity: 100.0,
            objective: ObjectiveMode::default(),
            solver: SolverKind::default(),
            warm_start: true,
            horizon: HorizonConfig::default(),
            buffer: BufferConfig::default(),
            trigger: TriggerConfig::default(),
            ema_alpha: 0.3,
            allow_stale_on_solver_error: false,
            solve_time_warning: 1.0,
        }
    }
}

impl ControllerConfig {
    /// Create a config with the given capacity and default policy parameters.
    pub fn new(capacity: f64) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), AllocError> {
        if !self.capacity.is_finite() || self.capacity <= 0.0 {
            return Err(error_stack::report!(AllocError::invalid_config(
                "capacity must be a finite value > 0"
            )));
        }
        if self.horizon.periods == 0 {
            return Err(error_stack::report!(AllocError::invalid_config(
                "horizon.periods must be >= 1"
            )));
        }
        if !(self.horizon.discount > 0.0 && self.horizon.discount < 1.0) {
            return Err(error_stack::report!(AllocError::invalid_config(
                "horizon.discount must be in (0, 1)"
            )));
        }
        if !self.buffer.coefficient.is_finite() || self.buffer.coefficient < 0.0 {
            return Err(error_stack::report!(AllocError::invalid_config(
                "buffer.coefficient must be a finite value >= 0"
            )));
        }
        if self.buffer.window == 0 {
            return Err(error_stack::report!(AllocError::invalid_config(
                "buffer.window must be >= 1"
            )));
        }
        if !self.trigger.resolve_interval.is_finite() || self.trigger.resolve_interval < 0.0 {
            return Err(error_stack::report!(AllocError::invalid_config(
                "trigger.resolveInterval must be a finite value >= 0"
            )));
        }
        if self.trigger.load_change.is_nan() || self.trigger.load_change <= 0.0 {
            return Err(error_stack::report!(AllocError::invalid_config(
                "trigger.loadChange must be > 0"
            )));
        }
        if self.trigger.price_change.is_nan() || self.trigger.price_change <= 0.0 {
            return Err(error_stack::report!(AllocError::invalid_config(
                "trigger.priceChange must be > 0"
            )));
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(error_stack::report!(AllocError::invalid_config(
                "emaAlpha must be in (0, 1]"
            )));
        }
        if self.solve_time_warning.is_nan() || self.solve_time_warning <= 0.0 {
            return Err(error_stack::report!(AllocError::invalid_config(
                "solveTimeWarning must be > 0"
            )));
        }
        Ok(())
    }
}

/// Accepts both `0.3` and `"0.3"`, since config is often templated as strings.
fn deserialize_f64_from_string<'de, D>(deserializer: D) -> core::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        String(String),
        Float(f64),
    }

    match StringOrFloat::deserialize(deserializer)? {
        StringOrFloat::String(s) => s.trim().parse::<f64>().map_err(|e| {
            serde::de::Error::custom(format!("Failed to parse float from string '{s}': {e}"))
        }),
        StringOrFloat::Float(f) => Ok(f),
    }
}

use derive_more::Display;

/// Error type shared by the controller and the solver backends.
#[derive(Debug, Display)]
pub enum AllocError {
    /// Hard minimums cannot fit into the effective capacity.
    #[display(
        "hard SLA minimums require {required:.3} but only {available:.3} capacity is available"
    )]
    Infeasible { required: f64, available: f64 },
    /// The optimizer failed to produce an optimum.
    #[display("solver failed: {reason}")]
    SolverFailure { reason: String },
    /// Configuration is invalid or inconsistent.
    #[display("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
    /// A client record cannot be used as LP input.
    #[display("invalid client input: {reason}")]
    InvalidClient { reason: String },
    /// The tick timestamp is NaN or infinite.
    #[display("invalid tick timestamp: {now}")]
    InvalidTimestamp { now: f64 },
    /// Shared controller state could not be accessed.
    #[display("controller state unavailable: {reason}")]
    StateUnavailable { reason: String },
}

impl core::error::Error for AllocError {}

impl AllocError {
    pub fn infeasible(required: f64, available: f64) -> Self {
        Self::Infeasible {
            required,
            available,
        }
    }

    pub fn solver(reason: impl Into<String>) -> Self {
        Self::SolverFailure {
            reason: reason.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub fn invalid_client(reason: impl Into<String>) -> Self {
        Self::InvalidClient {
            reason: reason.into(),
        }
    }

    pub fn invalid_timestamp(now: f64) -> Self {
        Self::InvalidTimestamp { now }
    }

    pub fn state(reason: impl Into<String>) -> Self {
        Self::StateUnavailable {
            reason: reason.into(),
        }
    }
}

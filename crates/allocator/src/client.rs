use std::collections::HashSet;

use error_stack::Result;
use serde::{Deserialize, Serialize};

use crate::AllocError;

/// A consumer of the shared capacity, re-observed by the caller every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    /// Currently requested rate. Doubles as the upper bound of the allocation.
    pub demand: f64,
    /// Objective coefficient in throughput mode.
    pub weight: f64,
    /// Hard SLA minimum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rate: Option<f64>,
    /// Price ceiling per unit, the objective coefficient in revenue mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub willingness_to_pay: Option<f64>,
}

impl Client {
    pub fn new(id: impl Into<String>, demand: f64, weight: f64) -> Self {
        Self {
            id: id.into(),
            demand,
            weight,
            min_rate: None,
            willingness_to_pay: None,
        }
    }

    pub fn with_min_rate(mut self, min_rate: f64) -> Self {
        self.min_rate = Some(min_rate);
        self
    }

    pub fn with_willingness_to_pay(mut self, price: f64) -> Self {
        self.willingness_to_pay = Some(price);
        self
    }

    /// Hard minimum, zero when the client has no SLA.
    pub fn min_rate(&self) -> f64 {
        self.min_rate.unwrap_or(0.0)
    }

    fn validate(&self) -> Result<(), AllocError> {
        check_non_negative(&self.id, "demand", self.demand)?;
        check_non_negative(&self.id, "weight", self.weight)?;
        if let Some(min_rate) = self.min_rate {
            check_non_negative(&self.id, "minRate", min_rate)?;
        }
        if let Some(price) = self.willingness_to_pay {
            check_non_negative(&self.id, "willingnessToPay", price)?;
        }
        Ok(())
    }
}

fn check_non_negative(id: &str, field: &str, value: f64) -> Result<(), AllocError> {
    if !value.is_finite() || value < 0.0 {
        return Err(error_stack::report!(AllocError::invalid_client(format!(
            "client `{id}`: {field} must be a finite value >= 0, got {value}"
        ))));
    }
    Ok(())
}

/// Reject duplicate ids and out-of-range values before anything reaches the LP.
pub fn validate_clients(clients: &[Client]) -> Result<(), AllocError> {
    let mut seen = HashSet::with_capacity(clients.len());
    for client in clients {
        if !seen.insert(client.id.as_str()) {
            return Err(error_stack::report!(AllocError::invalid_client(format!(
                "duplicate client id `{}`",
                client.id
            ))));
        }
        client.validate()?;
    }
    Ok(())
}

/// Sum of declared demand across all clients.
pub fn aggregate_demand(clients: &[Client]) -> f64 {
    clients.iter().map(|c| c.demand).sum()
}

/// Sum of raw hard minimums, before any capping by demand.
pub fn total_min_rate(clients: &[Client]) -> f64 {
    clients.iter().map(Client::min_rate).sum()
}

//! Rolling-horizon problem construction.
//!
//! Period 1 uses the observed demand; periods 2..T use forecast demand and
//! are weighted by `γ^(t-1)`. Only period 1 is applied, the rest is look-ahead.

use crate::client::Client;
use crate::config::{HorizonConfig, ObjectiveMode};
use crate::problem::{AllocationProblem, Lane, PeriodProblem};

/// Source of future demand.
pub trait DemandForecaster: Send {
    /// Demand rows for the `periods` periods after the current one, each row
    /// aligned with `clients`. `None` means no forecast is available.
    fn forecast(&self, clients: &[Client], now: f64, periods: usize) -> Option<Vec<Vec<f64>>>;
}

/// No look-ahead; the horizon collapses to the current period.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoForecast;

impl DemandForecaster for NoForecast {
    fn forecast(&self, _clients: &[Client], _now: f64, _periods: usize) -> Option<Vec<Vec<f64>>> {
        None
    }
}

/// Assumes demand stays where it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PersistenceForecast;

impl DemandForecaster for PersistenceForecast {
    fn forecast(&self, clients: &[Client], _now: f64, periods: usize) -> Option<Vec<Vec<f64>>> {
        let row: Vec<f64> = clients.iter().map(|c| c.demand).collect();
        Some(vec![row; periods])
    }
}

/// Build the horizon LP for `clients` against `capacity`.
///
/// Forecast rows with a wrong length or negative/non-finite values make the
/// forecast unusable and the horizon collapses to one period. Fewer rows than
/// requested shorten the horizon.
pub fn build_problem(
    clients: &[Client],
    mode: ObjectiveMode,
    capacity: f64,
    cfg: &HorizonConfig,
    forecast: Option<Vec<Vec<f64>>>,
) -> AllocationProblem {
    let mut problem = AllocationProblem::single_period(clients, mode, capacity);
    let lookahead = cfg.periods.saturating_sub(1);
    if lookahead == 0 {
        return problem;
    }

    let Some(rows) = forecast else {
        return problem;
    };
    let usable = rows.iter().all(|row| {
        row.len() == clients.len() && row.iter().all(|d| d.is_finite() && *d >= 0.0)
    });
    if !usable {
        tracing::warn!(
            clients = clients.len(),
            rows = rows.len(),
            "Discarding malformed demand forecast, solving current period only"
        );
        return problem;
    }

    let mut discount = 1.0;
    for row in rows.into_iter().take(lookahead) {
        discount *= cfg.discount;
        let lanes = clients
            .iter()
            .zip(row)
            .map(|(client, demand)| Lane::for_client(client, mode, demand))
            .collect();
        problem.periods.push(PeriodProblem {
            discount,
            capacity,
            lanes,
        });
    }

    problem
}

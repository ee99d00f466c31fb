use error_stack::Result;

use super::LpSolver;
use crate::problem::{AllocationProblem, PeriodProblem, SolveOutcome, TOLERANCE};
use crate::AllocError;

/// Exact solver for the allocation LP structure.
///
/// With one capacity row per period and box bounds per variable, the LP is a
/// continuous knapsack: start every lane at its lower bound, then hand the
/// remaining capacity out in decreasing coefficient order.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedySolver;

impl GreedySolver {
    fn fill_period(period: &PeriodProblem) -> Result<Vec<f64>, AllocError> {
        let required = period.min_load();
        if required > period.capacity + TOLERANCE {
            return Err(error_stack::report!(AllocError::infeasible(
                required,
                period.capacity
            )));
        }

        let mut rates: Vec<f64> = period.lanes.iter().map(|l| l.lower).collect();
        let mut remaining = (period.capacity - required).max(0.0);

        // Zero-coefficient lanes add nothing to the objective and stay at their minimum.
        let mut order: Vec<usize> = (0..period.lanes.len())
            .filter(|&i| period.lanes[i].coefficient > 0.0)
            .collect();
        order.sort_by(|&a, &b| {
            period.lanes[b]
                .coefficient
                .total_cmp(&period.lanes[a].coefficient)
                .then(a.cmp(&b))
        });

        for i in order {
            if remaining <= 0.0 {
                break;
            }
            let lane = &period.lanes[i];
            let take = (lane.upper - lane.lower).max(0.0).min(remaining);
            rates[i] += take;
            remaining -= take;
        }

        Ok(rates)
    }
}

impl LpSolver for GreedySolver {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn solve(&self, problem: &AllocationProblem) -> Result<SolveOutcome, AllocError> {
        if problem.is_empty() {
            return Ok(SolveOutcome::empty(problem));
        }

        let rates = problem
            .periods
            .iter()
            .map(Self::fill_period)
            .collect::<Result<Vec<_>, AllocError>>()?;
        let objective = problem.objective(&rates);

        tracing::trace!(
            periods = problem.periods.len(),
            clients = problem.num_clients(),
            objective = objective,
            "Greedy fill complete"
        );

        Ok(SolveOutcome { rates, objective })
    }
}

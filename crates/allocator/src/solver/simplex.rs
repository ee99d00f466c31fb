use error_stack::Result;
use microlp::{ComparisonOp, OptimizationDirection, Problem, Variable};

use super::LpSolver;
use crate::problem::{AllocationProblem, SolveOutcome, TOLERANCE};
use crate::AllocError;

/// General LP backend built on the `microlp` simplex implementation.
///
/// The whole horizon goes into one model: one variable per client and
/// period, one capacity row per period. `microlp` always starts from a fresh
/// basis.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexSolver;

impl LpSolver for SimplexSolver {
    fn name(&self) -> &'static str {
        "simplex"
    }

    fn solve(&self, problem: &AllocationProblem) -> Result<SolveOutcome, AllocError> {
        if problem.is_empty() {
            return Ok(SolveOutcome::empty(problem));
        }

        // microlp reports infeasibility without saying which row failed.
        for period in &problem.periods {
            let required = period.min_load();
            if required > period.capacity + TOLERANCE {
                return Err(error_stack::report!(AllocError::infeasible(
                    required,
                    period.capacity
                )));
            }
        }

        let mut lp = Problem::new(OptimizationDirection::Maximize);
        let mut vars: Vec<Vec<Variable>> = Vec::with_capacity(problem.periods.len());
        for period in &problem.periods {
            let mut period_vars = Vec::with_capacity(period.lanes.len());
            for lane in &period.lanes {
                period_vars.push(lp.add_var(
                    period.discount * lane.coefficient,
                    (lane.lower, lane.upper),
                ));
            }
            lp.add_constraint(
                period_vars.iter().map(|&v| (v, 1.0)),
                ComparisonOp::Le,
                period.capacity,
            );
            vars.push(period_vars);
        }

        let solution = lp.solve().map_err(|err| match err {
            microlp::Error::Infeasible => {
                let required = problem
                    .periods
                    .iter()
                    .map(|p| p.min_load())
                    .fold(0.0, f64::max);
                let available = problem
                    .periods
                    .first()
                    .map_or(0.0, |p| p.capacity);
                error_stack::report!(AllocError::infeasible(required, available))
            }
            other => error_stack::report!(AllocError::solver(other.to_string())),
        })?;

        let rates: Vec<Vec<f64>> = problem
            .periods
            .iter()
            .zip(&vars)
            .map(|(period, period_vars)| {
                let mut rates: Vec<f64> =
                    period_vars.iter().map(|&v| *solution.var_value(v)).collect();
                period.snap(&mut rates);
                rates
            })
            .collect();

        if rates
            .iter()
            .flatten()
            .any(|rate| !rate.is_finite())
        {
            return Err(error_stack::report!(AllocError::solver(
                "simplex returned a non-finite rate"
            )));
        }

        tracing::trace!(
            periods = problem.periods.len(),
            clients = problem.num_clients(),
            objective = solution.objective(),
            "Simplex solve complete"
        );

        Ok(SolveOutcome {
            objective: problem.objective(&rates),
            rates,
        })
    }
}

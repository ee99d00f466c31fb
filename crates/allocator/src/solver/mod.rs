//! Solver backends for [`AllocationProblem`].

mod greedy;
mod simplex;

use error_stack::Result;

use crate::config::SolverKind;
use crate::problem::{AllocationProblem, SolveOutcome};
use crate::AllocError;

pub use greedy::GreedySolver;
pub use simplex::SimplexSolver;

/// Minimal interface the controller expects from an LP backend.
///
/// Implementations must return optimal rates for every period, within
/// bounds and capacity, or an error. Infeasible minimums are reported as
/// [`AllocError::Infeasible`], any other failure as
/// [`AllocError::SolverFailure`].
pub trait LpSolver: Send {
    fn name(&self) -> &'static str;

    fn solve(&self, problem: &AllocationProblem) -> Result<SolveOutcome, AllocError>;
}

impl LpSolver for Box<dyn LpSolver> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn solve(&self, problem: &AllocationProblem) -> Result<SolveOutcome, AllocError> {
        (**self).solve(problem)
    }
}

/// Build the backend selected in configuration.
pub fn solver_for(kind: SolverKind) -> Box<dyn LpSolver> {
    match kind {
        SolverKind::Simplex => Box::new(SimplexSolver),
        SolverKind::Greedy => Box::new(GreedySolver),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::config::ObjectiveMode;
    use crate::problem::{Lane, PeriodProblem};

    fn backends() -> Vec<Box<dyn LpSolver>> {
        vec![solver_for(SolverKind::Simplex), solver_for(SolverKind::Greedy)]
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }

    #[test]
    fn backends_agree_on_weighted_split() {
        let clients = vec![Client::new("a", 60.0, 2.0), Client::new("b", 60.0, 1.0)];
        let problem = AllocationProblem::single_period(&clients, ObjectiveMode::Throughput, 100.0);

        for solver in backends() {
            let outcome = solver.solve(&problem).unwrap();
            assert_close(outcome.rates[0][0], 60.0);
            assert_close(outcome.rates[0][1], 40.0);
            assert_close(outcome.objective, 160.0);
            assert_close(problem.periods[0].capacity_dual(&outcome.rates[0]), 1.0);
        }
    }

    #[test]
    fn backends_honor_minimums_over_weights() {
        let clients = vec![
            Client::new("premium", 50.0, 1.0).with_min_rate(30.0),
            Client::new("standard", 80.0, 5.0),
        ];
        let problem = AllocationProblem::single_period(&clients, ObjectiveMode::Throughput, 100.0);

        for solver in backends() {
            let outcome = solver.solve(&problem).unwrap();
            assert_close(outcome.rates[0][0], 30.0);
            assert_close(outcome.rates[0][1], 70.0);
            assert_close(outcome.objective, 380.0);
        }
    }

    #[test]
    fn backends_report_infeasible_minimums() {
        let problem = AllocationProblem {
            periods: vec![PeriodProblem {
                discount: 1.0,
                capacity: 10.0,
                lanes: vec![Lane::new(1.0, 8.0, 8.0), Lane::new(1.0, 5.0, 9.0)],
            }],
        };

        for solver in backends() {
            let err = solver.solve(&problem).unwrap_err();
            assert!(
                matches!(err.current_context(), AllocError::Infeasible { .. }),
                "{} should report infeasibility",
                solver.name()
            );
        }
    }

    #[test]
    fn backends_discount_lookahead_periods() {
        let lanes = vec![Lane::new(3.0, 0.0, 10.0), Lane::new(1.0, 0.0, 10.0)];
        let problem = AllocationProblem {
            periods: vec![
                PeriodProblem {
                    discount: 1.0,
                    capacity: 12.0,
                    lanes: lanes.clone(),
                },
                PeriodProblem {
                    discount: 0.5,
                    capacity: 12.0,
                    lanes,
                },
            ],
        };

        for solver in backends() {
            let outcome = solver.solve(&problem).unwrap();
            assert_eq!(outcome.rates.len(), 2);
            // 3·10 + 1·2 = 32 per period, second period at half weight.
            assert_close(outcome.objective, 48.0);
        }
    }
}

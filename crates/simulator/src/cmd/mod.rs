//! Command layer - entry points for the `ratesim` subcommands

use allocator::AllocError;
use error_stack::Report;

pub mod simulate;
pub mod solve;

pub use simulate::{compare, run_simulate, simulate};
pub use solve::{run_solve, solve_scenario};

/// Flatten an allocator report, keeping its attached context chain.
pub(crate) fn report_to_anyhow(report: Report<AllocError>) -> anyhow::Error {
    anyhow::anyhow!("{report:?}")
}

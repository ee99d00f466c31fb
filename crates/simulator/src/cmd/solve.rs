use std::path::Path;
use std::sync::Arc;

use allocator::AllocationController;
use allocator::Solution;
use anyhow::Context;
use anyhow::Result;

use super::report_to_anyhow;
use crate::config::load_scenario;
use crate::config::SolveArgs;

/// Run one controller tick over a scenario file.
pub fn solve_scenario(path: &Path) -> Result<Arc<Solution>> {
    let scenario = load_scenario(path)?;
    tracing::info!(
        scenario = %path.display(),
        clients = scenario.clients.len(),
        capacity = scenario.config.capacity,
        "Solving scenario"
    );

    let mut controller = AllocationController::new(scenario.config).map_err(report_to_anyhow)?;
    controller
        .evaluate(&scenario.clients, scenario.now)
        .map_err(report_to_anyhow)
        .with_context(|| format!("failed to solve {}", path.display()))
}

pub fn run_solve(args: SolveArgs) -> Result<()> {
    utils::logging::init();

    let solution = solve_scenario(&args.scenario)?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&*solution)?
    } else {
        serde_json::to_string(&*solution)?
    };
    println!("{json}");
    Ok(())
}

use std::sync::Arc;

use allocator::AllocError;
use allocator::AllocationController;
use allocator::Client;
use allocator::ControllerConfig;
use allocator::Solution;
use anyhow::Context;
use anyhow::Result;

use super::report_to_anyhow;
use crate::compare::basic_config;
use crate::compare::Algorithm;
use crate::compare::AlgorithmResult;
use crate::compare::ComparisonReport;
use crate::compare::StaticTokenBucket;
use crate::config::load_controller_config;
use crate::config::SimulateArgs;
use crate::logging;
use crate::metrics;
use crate::metrics::MetricsEncoder;
use crate::report::SimulationSummary;
use crate::workload::Workload;
use crate::workload::WorkloadConfig;

fn prepare(args: &SimulateArgs) -> Result<(ControllerConfig, Workload)> {
    let mut cfg = match &args.config {
        Some(path) => load_controller_config(path)?,
        None => ControllerConfig::default(),
    };
    if let Some(capacity) = args.capacity {
        cfg.capacity = capacity;
    }

    let workload = Workload::generate(&WorkloadConfig::from(args))?;
    if !workload.statistics(cfg.capacity).hard_sla_feasible {
        tracing::warn!(
            capacity = cfg.capacity,
            "Hard SLA minimums exceed capacity, every tick will be infeasible"
        );
    }
    tracing::info!(
        pattern = args.pattern.name(),
        ticks = workload.len(),
        capacity = cfg.capacity,
        seed = args.seed,
        "Starting simulation"
    );
    Ok((cfg, workload))
}

/// Feed every workload tick through `allocate` and account the outcome.
fn drive<F>(
    workload: &Workload,
    summary: &mut SimulationSummary,
    encoder: Option<&dyn MetricsEncoder>,
    mut allocate: F,
) -> Result<()>
where
    F: FnMut(&[Client], f64) -> allocator::Result<Arc<Solution>, AllocError>,
{
    let pattern = workload.config().pattern.name();
    for (now, clients) in workload.ticks() {
        match allocate(clients, now) {
            Ok(solution) => {
                if let Some(encoder) = encoder {
                    let lines = metrics::encode_tick(encoder, pattern, clients, &solution, now);
                    metrics::emit(&lines);
                }
                summary.record(clients, &solution, solution.timestamp == now);
            }
            Err(report) if matches!(report.current_context(), AllocError::Infeasible { .. }) => {
                tracing::warn!(now, "Tick infeasible: {}", report.current_context());
                summary.record_infeasible(clients);
            }
            Err(report) => {
                return Err(report_to_anyhow(report))
                    .with_context(|| format!("allocation failed at t={now}"));
            }
        }
    }
    Ok(())
}

fn run_controller(
    cfg: ControllerConfig,
    workload: &Workload,
    encoder: Option<&dyn MetricsEncoder>,
) -> Result<SimulationSummary> {
    let capacity = cfg.capacity;
    let mut controller = AllocationController::new(cfg)
        .map_err(report_to_anyhow)?
        .with_forecaster(workload.forecaster());
    let mut summary = SimulationSummary::new(workload.statistics(capacity));

    drive(workload, &mut summary, encoder, |clients, now| {
        controller.evaluate(clients, now)
    })?;
    Ok(summary.finish(controller.stats()))
}

/// Drive a controller over a generated workload, one evaluation per step.
pub fn simulate(args: &SimulateArgs) -> Result<SimulationSummary> {
    let (cfg, workload) = prepare(args)?;
    let encoder = metrics::create_encoder(args.metrics_format);

    let summary = run_controller(cfg, &workload, Some(encoder.as_ref()))?;
    tracing::info!(
        solves = summary.controller.solves,
        skipped = summary.controller.skipped,
        infeasible = summary.infeasible_ticks,
        mean_price = %format!("{:.4}", summary.mean_shadow_price),
        "Simulation finished"
    );
    Ok(summary)
}

/// Run one workload through the token bucket, a plain LP and the controller.
pub fn compare(args: &SimulateArgs) -> Result<ComparisonReport> {
    let (cfg, workload) = prepare(args)?;
    let stats = workload.statistics(cfg.capacity);
    let encoder = metrics::create_encoder(args.metrics_format);

    let mut bucket = StaticTokenBucket::new(cfg.capacity);
    let mut bucket_summary = SimulationSummary::new(stats.clone()).without_pricing();
    drive(&workload, &mut bucket_summary, None, |clients, now| {
        Ok(Arc::new(bucket.allocate(clients, now)))
    })?;
    let bucket_summary = bucket_summary.finish(&Default::default());

    let mut basic = AllocationController::new(basic_config(&cfg)).map_err(report_to_anyhow)?;
    let mut basic_summary = SimulationSummary::new(stats.clone());
    drive(&workload, &mut basic_summary, None, |clients, now| {
        basic.force_resolve(clients, now)
    })?;
    let basic_summary = basic_summary.finish(basic.stats());

    let controller_summary = run_controller(cfg, &workload, Some(encoder.as_ref()))?;

    let results = vec![
        AlgorithmResult::from_summary(Algorithm::StaticTokenBucket, &bucket_summary),
        AlgorithmResult::from_summary(Algorithm::BasicLp, &basic_summary),
        AlgorithmResult::from_summary(Algorithm::Controller, &controller_summary),
    ];
    for result in &results {
        tracing::info!(
            algorithm = ?result.algorithm,
            acceptance = %format!("{:.4}", result.acceptance_rate),
            sla_compliance = %format!("{:.4}", result.sla_compliance_rate),
            revenue = %format!("{:.2}", result.total_revenue),
            price_std = %format!("{:.4}", result.price_std),
            solves = result.solves,
            "Algorithm finished"
        );
    }

    Ok(ComparisonReport {
        pattern: args.pattern,
        workload: stats,
        results,
    })
}

pub fn run_simulate(args: SimulateArgs) -> Result<()> {
    let _guard = logging::init(args.metrics_file.as_deref());

    let json = if args.compare {
        serde_json::to_string_pretty(&compare(&args)?)?
    } else {
        serde_json::to_string_pretty(&simulate(&args)?)?
    };
    println!("{json}");
    Ok(())
}

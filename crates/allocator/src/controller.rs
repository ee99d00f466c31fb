//! The allocation controller: one call per tick.
//!
//! Each tick records demand, derives the buffered capacity, asks the trigger
//! policy whether the cached solution is still usable, and only then builds
//! and solves the horizon LP.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use error_stack::Result;

use crate::buffer::{CapacityState, DemandHistory, RobustBuffer};
use crate::client::{aggregate_demand, total_min_rate, validate_clients, Client};
use crate::config::ControllerConfig;
use crate::horizon::{build_problem, DemandForecaster, NoForecast};
use crate::problem::{AllocationProblem, SolveOutcome, TOLERANCE};
use crate::smoothing::PriceSmoother;
use crate::solution::Solution;
use crate::solver::{solver_for, LpSolver};
use crate::stats::ControllerStats;
use crate::trigger::{estimate_price, ResolveReason, TriggerPolicy, TriggerState};
use crate::warm_start::WarmStart;
use crate::AllocError;

/// Per-tick inputs shared by the trigger check and the solve.
struct Tick<'a> {
    clients: &'a [Client],
    now: f64,
    load: f64,
    price_estimate: f64,
    capacity: CapacityState,
}

/// Owns the cached solution and every piece of cross-tick state.
///
/// Single-threaded; wrap it in a [`SharedController`] to share it.
pub struct AllocationController<S: LpSolver = Box<dyn LpSolver>> {
    cfg: ControllerConfig,
    solver: S,
    forecaster: Box<dyn DemandForecaster>,
    history: DemandHistory,
    buffer: RobustBuffer,
    trigger: TriggerPolicy,
    trigger_state: Option<TriggerState>,
    smoother: PriceSmoother,
    previous: Option<Arc<Solution>>,
    stats: ControllerStats,
    solve_count: u64,
}

impl AllocationController {
    /// Validate `cfg` and build a controller with the configured backend.
    pub fn new(cfg: ControllerConfig) -> Result<Self, AllocError> {
        let solver = solver_for(cfg.solver);
        Self::with_solver(cfg, solver)
    }
}

impl<S: LpSolver> AllocationController<S> {
    pub fn with_solver(cfg: ControllerConfig, solver: S) -> Result<Self, AllocError> {
        cfg.validate()?;

        tracing::debug!(
            capacity = cfg.capacity,
            objective = ?cfg.objective,
            solver = solver.name(),
            periods = cfg.horizon.periods,
            buffer_coefficient = cfg.buffer.coefficient,
            "Initialized allocation controller"
        );

        Ok(Self {
            history: DemandHistory::new(cfg.buffer.window),
            buffer: RobustBuffer::new(&cfg.buffer),
            trigger: TriggerPolicy::new(cfg.trigger.clone()),
            smoother: PriceSmoother::new(cfg.ema_alpha),
            forecaster: Box::new(NoForecast),
            trigger_state: None,
            previous: None,
            stats: ControllerStats::default(),
            solve_count: 0,
            solver,
            cfg,
        })
    }

    /// Use `forecaster` for the look-ahead periods of the horizon.
    pub fn with_forecaster(mut self, forecaster: impl DemandForecaster + 'static) -> Self {
        self.forecaster = Box::new(forecaster);
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.cfg
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    pub fn previous_solution(&self) -> Option<Arc<Solution>> {
        self.previous.clone()
    }

    /// Forget the cached solution and all history, as if freshly built.
    pub fn reset_cache(&mut self) {
        self.previous = None;
        self.trigger_state = None;
        self.smoother.reset();
        self.history.clear();
        self.stats = ControllerStats::default();
        self.solve_count = 0;
    }

    /// Return the current allocation, re-solving only when a trigger fires.
    pub fn evaluate(&mut self, clients: &[Client], now: f64) -> Result<Arc<Solution>, AllocError> {
        let tick = self.observe(clients, now)?;

        let fired = self.trigger.check(
            self.trigger_state.as_ref(),
            now,
            tick.load,
            tick.price_estimate,
        );
        let reason = match (fired, &self.previous) {
            (Some(reason), _) => reason,
            (None, Some(cached)) => {
                self.stats.skipped += 1;
                tracing::debug!(
                    now = now,
                    cached_period = cached.period,
                    "Reusing cached allocation"
                );
                return Ok(Arc::clone(cached));
            }
            (None, None) => ResolveReason::Initial,
        };

        self.solve(tick, reason)
    }

    /// Re-solve unconditionally.
    pub fn force_resolve(
        &mut self,
        clients: &[Client],
        now: f64,
    ) -> Result<Arc<Solution>, AllocError> {
        let tick = self.observe(clients, now)?;
        self.solve(tick, ResolveReason::Forced)
    }

    fn observe<'a>(&mut self, clients: &'a [Client], now: f64) -> Result<Tick<'a>, AllocError> {
        if !now.is_finite() {
            return Err(error_stack::report!(AllocError::invalid_timestamp(now)));
        }
        validate_clients(clients)?;

        let load = aggregate_demand(clients);
        self.history.record(load);
        let capacity = self.buffer.capacity_state(self.cfg.capacity, &self.history);
        let price_estimate = estimate_price(clients, self.cfg.objective, capacity.effective);

        Ok(Tick {
            clients,
            now,
            load,
            price_estimate,
            capacity,
        })
    }

    fn solve(
        &mut self,
        tick: Tick<'_>,
        reason: ResolveReason,
    ) -> Result<Arc<Solution>, AllocError> {
        let required = total_min_rate(tick.clients);
        if required > tick.capacity.effective + TOLERANCE {
            self.stats.infeasible += 1;
            tracing::warn!(
                required = %format!("{:.3}", required),
                effective_capacity = %format!("{:.3}", tick.capacity.effective),
                buffer = %format!("{:.3}", tick.capacity.buffer),
                "Hard minimums exceed effective capacity"
            );
            return Err(error_stack::report!(AllocError::infeasible(
                required,
                tick.capacity.effective
            )));
        }

        let started = Instant::now();
        let lookahead = self.cfg.horizon.periods.saturating_sub(1);
        let forecast = if lookahead > 0 && !tick.clients.is_empty() {
            self.forecaster.forecast(tick.clients, tick.now, lookahead)
        } else {
            None
        };
        let problem = build_problem(
            tick.clients,
            self.cfg.objective,
            tick.capacity.effective,
            &self.cfg.horizon,
            forecast,
        );

        let (outcome, warm_started) = match self.run_backend(tick.clients, &problem) {
            Ok(result) => result,
            Err(report) => return self.fall_back(report),
        };
        let solve_time = started.elapsed();

        let applied = outcome.rates.first().cloned().unwrap_or_default();
        let shadow_price = problem
            .periods
            .first()
            .map_or(0.0, |period| period.capacity_dual(&applied));
        let horizon_prices: Vec<f64> = problem
            .periods
            .iter()
            .zip(&outcome.rates)
            .skip(1)
            .map(|(period, rates)| period.capacity_dual(rates))
            .collect();
        let smoothed_price = self.smoother.observe(shadow_price);

        self.solve_count += 1;
        let solution = Arc::new(Solution {
            period: self.solve_count,
            timestamp: tick.now,
            allocations: tick
                .clients
                .iter()
                .zip(&applied)
                .map(|(client, rate)| (client.id.clone(), *rate))
                .collect(),
            shadow_price,
            smoothed_price,
            objective_value: outcome.objective,
            horizon_prices,
            capacity: tick.capacity,
            reason,
            warm_started,
            solve_time,
        });

        if solve_time.as_secs_f64() > self.cfg.solve_time_warning {
            tracing::warn!(
                solver = self.solver.name(),
                clients = tick.clients.len(),
                periods = problem.periods.len(),
                solve_time = ?solve_time,
                "Slow LP solve"
            );
        }

        tracing::info!(
            period = solution.period,
            reason = ?reason,
            clients = tick.clients.len(),
            load = %format!("{:.1}", tick.load),
            effective_capacity = %format!("{:.1}", tick.capacity.effective),
            allocated = %format!("{:.1}", solution.total_allocated()),
            shadow_price = %format!("{:.4}", shadow_price),
            smoothed_price = %format!("{:.4}", smoothed_price),
            objective = %format!("{:.3}", outcome.objective),
            warm_started = warm_started,
            solve_time = ?solve_time,
            "Allocation solved"
        );

        self.stats.record_solve(reason, warm_started, shadow_price);
        self.trigger_state = Some(TriggerState {
            last_solve: tick.now,
            last_load: tick.load,
            last_price_estimate: tick.price_estimate,
            last_shadow_price: shadow_price,
        });
        self.previous = Some(Arc::clone(&solution));

        Ok(solution)
    }

    /// Certified warm start first, backend otherwise.
    fn run_backend(
        &self,
        clients: &[Client],
        problem: &AllocationProblem,
    ) -> Result<(SolveOutcome, bool), AllocError> {
        if problem.is_empty() {
            return Ok((SolveOutcome::empty(problem), false));
        }

        if self.cfg.warm_start {
            if let Some(previous) = &self.previous {
                let hint = WarmStart::align(previous, clients);
                if let Some(outcome) = hint.certify(problem) {
                    tracing::debug!(
                        carried = hint.carried(),
                        dropped = hint.dropped(),
                        "Previous allocation still optimal, skipping solver"
                    );
                    return Ok((outcome, true));
                }
                tracing::debug!(
                    carried = hint.carried(),
                    dropped = hint.dropped(),
                    "Previous allocation not optimal, solving from scratch"
                );
            }
        }

        let outcome = self.solver.solve(problem)?;
        Ok((outcome, false))
    }

    fn fall_back(
        &mut self,
        report: error_stack::Report<AllocError>,
    ) -> Result<Arc<Solution>, AllocError> {
        if let AllocError::Infeasible { .. } = report.current_context() {
            self.stats.infeasible += 1;
            return Err(report);
        }

        self.stats.solver_failures += 1;
        match &self.previous {
            Some(cached) if self.cfg.allow_stale_on_solver_error => {
                self.stats.stale_fallbacks += 1;
                tracing::warn!(
                    solver = self.solver.name(),
                    cached_period = cached.period,
                    error = %report,
                    "Solver failed, serving cached allocation"
                );
                Ok(Arc::clone(cached))
            }
            _ => Err(report),
        }
    }
}

/// [`AllocationController`] behind a mutex, one critical section per tick.
pub struct SharedController<S: LpSolver = Box<dyn LpSolver>> {
    inner: Mutex<AllocationController<S>>,
}

impl<S: LpSolver> SharedController<S> {
    pub fn new(controller: AllocationController<S>) -> Self {
        Self {
            inner: Mutex::new(controller),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, AllocationController<S>>, AllocError> {
        self.inner
            .lock()
            .map_err(|_| error_stack::report!(AllocError::state("controller mutex poisoned")))
    }

    pub fn evaluate(&self, clients: &[Client], now: f64) -> Result<Arc<Solution>, AllocError> {
        self.lock()?.evaluate(clients, now)
    }

    pub fn force_resolve(&self, clients: &[Client], now: f64) -> Result<Arc<Solution>, AllocError> {
        self.lock()?.force_resolve(clients, now)
    }

    pub fn previous_solution(&self) -> Result<Option<Arc<Solution>>, AllocError> {
        Ok(self.lock()?.previous_solution())
    }

    pub fn stats(&self) -> Result<ControllerStats, AllocError> {
        Ok(self.lock()?.stats().clone())
    }

    pub fn reset_cache(&self) -> Result<(), AllocError> {
        self.lock()?.reset_cache();
        Ok(())
    }
}

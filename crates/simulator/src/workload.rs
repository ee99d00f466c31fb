//! Seeded synthetic workloads over a fixed set of client tiers.

use std::f64::consts::PI;
use std::sync::Arc;

use allocator::Client;
use allocator::DemandForecaster;
use anyhow::Context;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rand_distr::Distribution;
use rand_distr::Normal;
use serde::Deserialize;
use serde::Serialize;

/// Shape of the demand multiplier over time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pattern {
    /// Constant 0.8x base demand.
    #[default]
    Steady,
    /// 0.5x base with a few short spikes.
    Bursty,
    /// Linear 0.3x to 1.8x.
    Ramp,
    /// One sine cycle between 0.5x and 1.5x.
    Periodic,
    /// Gaussian steps, clipped to [0.2, 2.0].
    RandomWalk,
}

impl Pattern {
    pub fn name(&self) -> &'static str {
        match self {
            Pattern::Steady => "steady",
            Pattern::Bursty => "bursty",
            Pattern::Ramp => "ramp",
            Pattern::Periodic => "periodic",
            Pattern::RandomWalk => "random-walk",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadConfig {
    pub duration: f64,
    pub time_step: f64,
    pub pattern: Pattern,
    /// Std of the multiplicative per-client noise.
    pub noise: f64,
    pub seed: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            duration: 300.0,
            time_step: 10.0,
            pattern: Pattern::Steady,
            noise: 0.1,
            seed: 42,
        }
    }
}

struct ClientTemplate {
    id: &'static str,
    tier: &'static str,
    weight: f64,
    min_rate: f64,
    willingness_to_pay: f64,
    base_demand: f64,
}

// Base demand sums to 180 against a default capacity of 100.
const TEMPLATES: [ClientTemplate; 4] = [
    ClientTemplate {
        id: "alice",
        tier: "premium",
        weight: 10.0,
        min_rate: 30.0,
        willingness_to_pay: 0.50,
        base_demand: 55.0,
    },
    ClientTemplate {
        id: "bob",
        tier: "standard",
        weight: 5.0,
        min_rate: 0.0,
        willingness_to_pay: 0.20,
        base_demand: 45.0,
    },
    ClientTemplate {
        id: "carol",
        tier: "free",
        weight: 1.0,
        min_rate: 0.0,
        willingness_to_pay: 0.005,
        base_demand: 40.0,
    },
    ClientTemplate {
        id: "dave",
        tier: "standard",
        weight: 5.0,
        min_rate: 0.0,
        willingness_to_pay: 0.15,
        base_demand: 40.0,
    },
];

const NOISE_FLOOR: f64 = 0.1;

/// Client lists per time step.
#[derive(Debug, Clone)]
pub struct Workload {
    cfg: WorkloadConfig,
    steps: Arc<Vec<Vec<Client>>>,
}

impl Workload {
    pub fn generate(cfg: &WorkloadConfig) -> Result<Self> {
        anyhow::ensure!(
            cfg.time_step.is_finite() && cfg.time_step > 0.0,
            "time step must be > 0, got {}",
            cfg.time_step
        );
        anyhow::ensure!(
            cfg.duration.is_finite() && cfg.duration >= 0.0,
            "duration must be >= 0, got {}",
            cfg.duration
        );
        anyhow::ensure!(
            cfg.noise.is_finite() && cfg.noise >= 0.0,
            "noise must be a finite std >= 0, got {}",
            cfg.noise
        );

        let num_steps = (cfg.duration / cfg.time_step) as usize;
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let multipliers = multipliers(cfg.pattern, num_steps, &mut rng)?;
        let noise = Normal::new(0.0, cfg.noise)
            .with_context(|| format!("invalid noise level {}", cfg.noise))?;

        let steps = multipliers
            .iter()
            .map(|multiplier| {
                TEMPLATES
                    .iter()
                    .map(|t| {
                        let factor = (1.0 + noise.sample(&mut rng)).max(NOISE_FLOOR);
                        let mut client =
                            Client::new(t.id, t.base_demand * multiplier * factor, t.weight)
                                .with_willingness_to_pay(t.willingness_to_pay);
                        if t.min_rate > 0.0 {
                            client = client.with_min_rate(t.min_rate);
                        }
                        client
                    })
                    .collect()
            })
            .collect();

        tracing::debug!(
            pattern = cfg.pattern.name(),
            steps = num_steps,
            seed = cfg.seed,
            "Generated workload"
        );

        Ok(Self {
            cfg: cfg.clone(),
            steps: Arc::new(steps),
        })
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.cfg
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// `(timestamp, clients)` per step.
    pub fn ticks(&self) -> impl Iterator<Item = (f64, &[Client])> + '_ {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, clients)| (i as f64 * self.cfg.time_step, clients.as_slice()))
    }

    /// Look-ahead that reads future steps of this workload.
    pub fn forecaster(&self) -> WorkloadForecast {
        WorkloadForecast {
            time_step: self.cfg.time_step,
            steps: Arc::clone(&self.steps),
        }
    }

    pub fn statistics(&self, capacity: f64) -> WorkloadStats {
        let totals: Vec<f64> = self
            .steps
            .iter()
            .map(|clients| clients.iter().map(|c| c.demand).sum())
            .collect();
        let premium: Vec<f64> = self
            .steps
            .iter()
            .map(|clients| {
                clients
                    .iter()
                    .zip(TEMPLATES.iter())
                    .filter(|(_, t)| t.tier == "premium")
                    .map(|(c, _)| c.demand)
                    .sum()
            })
            .collect();

        let n = totals.len().max(1) as f64;
        let mean = totals.iter().sum::<f64>() / n;
        let std = (totals.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n).sqrt();
        let min = totals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = totals.iter().copied().fold(0.0, f64::max);
        let required: f64 = TEMPLATES.iter().map(|t| t.min_rate).sum();

        WorkloadStats {
            num_steps: totals.len(),
            duration: self.cfg.duration,
            pattern: self.cfg.pattern,
            total_demand_mean: mean,
            total_demand_std: std,
            total_demand_min: if totals.is_empty() { 0.0 } else { min },
            total_demand_max: max,
            capacity,
            avg_utilization: mean / capacity,
            peak_utilization: max / capacity,
            premium_demand_mean: premium.iter().sum::<f64>() / n,
            hard_sla_feasible: required <= capacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadStats {
    pub num_steps: usize,
    pub duration: f64,
    pub pattern: Pattern,
    pub total_demand_mean: f64,
    /// Population std across steps.
    pub total_demand_std: f64,
    pub total_demand_min: f64,
    pub total_demand_max: f64,
    pub capacity: f64,
    pub avg_utilization: f64,
    pub peak_utilization: f64,
    pub premium_demand_mean: f64,
    /// Whether the hard minimums fit into the configured capacity.
    pub hard_sla_feasible: bool,
}

/// Perfect-foresight forecaster over a generated workload.
#[derive(Debug, Clone)]
pub struct WorkloadForecast {
    time_step: f64,
    steps: Arc<Vec<Vec<Client>>>,
}

impl DemandForecaster for WorkloadForecast {
    fn forecast(&self, clients: &[Client], now: f64, periods: usize) -> Option<Vec<Vec<f64>>> {
        if !now.is_finite() || now < 0.0 {
            return None;
        }
        let current = (now / self.time_step).round() as usize;
        let rows: Vec<Vec<f64>> = self
            .steps
            .iter()
            .skip(current + 1)
            .take(periods)
            .map(|future| {
                clients
                    .iter()
                    .map(|c| {
                        future
                            .iter()
                            .find(|f| f.id == c.id)
                            .map_or(0.0, |f| f.demand)
                    })
                    .collect()
            })
            .collect();

        if rows.is_empty() {
            None
        } else {
            Some(rows)
        }
    }
}

fn multipliers(pattern: Pattern, n: usize, rng: &mut StdRng) -> Result<Vec<f64>> {
    let values = match pattern {
        Pattern::Steady => vec![0.8; n],
        Pattern::Bursty => {
            let mut values = vec![0.5; n];
            let spikes = rng.gen_range(3..6).min(n);
            for start in rand::seq::index::sample(rng, n, spikes).into_iter() {
                let duration = rng.gen_range(2..5);
                let magnitude = rng.gen_range(1.5..2.5);
                for value in values.iter_mut().skip(start).take(duration) {
                    *value = magnitude;
                }
            }
            values
        }
        Pattern::Ramp => linspace(0.3, 1.8, n),
        Pattern::Periodic => linspace(0.0, 2.0 * PI, n)
            .into_iter()
            .map(|t| 1.0 + 0.5 * t.sin())
            .collect(),
        Pattern::RandomWalk => {
            let step = Normal::new(0.0, 0.1).context("random walk step distribution")?;
            let mut values = Vec::with_capacity(n);
            let mut current: f64 = 1.0;
            for i in 0..n {
                if i > 0 {
                    current = (current + step.sample(rng)).clamp(0.2, 2.0);
                }
                values.push(current);
            }
            values
        }
    };
    Ok(values)
}

/// `n` evenly spaced points from `start` to `end` inclusive.
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn config(pattern: Pattern) -> WorkloadConfig {
        WorkloadConfig {
            pattern,
            ..Default::default()
        }
    }

    fn totals(workload: &Workload) -> Vec<f64> {
        workload
            .ticks()
            .map(|(_, clients)| clients.iter().map(|c| c.demand).sum())
            .collect()
    }

    #[test]
    fn same_seed_same_workload() {
        let a = Workload::generate(&config(Pattern::Bursty)).unwrap();
        let b = Workload::generate(&config(Pattern::Bursty)).unwrap();
        assert_eq!(totals(&a), totals(&b));

        let c = Workload::generate(&WorkloadConfig {
            seed: 7,
            ..config(Pattern::Bursty)
        })
        .unwrap();
        assert!(totals(&a) != totals(&c));
    }

    #[test]
    fn step_count_and_timestamps() {
        let workload = Workload::generate(&config(Pattern::Steady)).unwrap();
        assert_eq!(workload.len(), 30);
        let stamps: Vec<f64> = workload.ticks().map(|(t, _)| t).take(3).collect();
        assert_eq!(stamps, vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn noiseless_patterns_follow_their_shape() {
        let steady = Workload::generate(&WorkloadConfig {
            noise: 0.0,
            ..config(Pattern::Steady)
        })
        .unwrap();
        assert!(totals(&steady).iter().all(|t| (t - 144.0).abs() < 1e-9));

        let ramp = Workload::generate(&WorkloadConfig {
            noise: 0.0,
            ..config(Pattern::Ramp)
        })
        .unwrap();
        let ramp_totals = totals(&ramp);
        assert!((ramp_totals[0] - 54.0).abs() < 1e-9);
        assert!((ramp_totals[29] - 324.0).abs() < 1e-9);
    }

    #[test]
    fn multipliers_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let bursty = multipliers(Pattern::Bursty, 30, &mut rng).unwrap();
        assert!(bursty.iter().all(|m| *m == 0.5 || (1.5..2.5).contains(m)));
        assert!(bursty.iter().any(|m| *m > 1.0));

        let walk = multipliers(Pattern::RandomWalk, 200, &mut rng).unwrap();
        assert_eq!(walk[0], 1.0);
        assert!(walk.iter().all(|m| (0.2..=2.0).contains(m)));

        let periodic = multipliers(Pattern::Periodic, 30, &mut rng).unwrap();
        assert!(periodic.iter().all(|m| (0.5..=1.5).contains(m)));
    }

    #[test]
    fn noise_is_floored() {
        let workload = Workload::generate(&WorkloadConfig {
            noise: 5.0,
            ..config(Pattern::Steady)
        })
        .unwrap();
        for (_, clients) in workload.ticks() {
            for (client, template) in clients.iter().zip(TEMPLATES.iter()) {
                assert!(client.demand >= template.base_demand * 0.8 * NOISE_FLOOR - 1e-9);
            }
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(Workload::generate(&WorkloadConfig {
            time_step: 0.0,
            ..Default::default()
        })
        .is_err());
        assert!(Workload::generate(&WorkloadConfig {
            noise: -1.0,
            ..Default::default()
        })
        .is_err());
        assert!(Workload::generate(&WorkloadConfig {
            noise: f64::NAN,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn random_walk_stays_within_bounds() {
        let workload = Workload::generate(&config(Pattern::RandomWalk)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let values = multipliers(Pattern::RandomWalk, 200, &mut rng).unwrap();

        assert_eq!(values[0], 1.0);
        assert!(values.iter().all(|v| (0.2..=2.0).contains(v)));
        assert!(!workload.is_empty());
    }

    #[test]
    fn forecast_reads_future_steps() {
        let workload = Workload::generate(&config(Pattern::Ramp)).unwrap();
        let forecaster = workload.forecaster();
        let (_, now_clients) = workload.ticks().nth(2).unwrap();

        let rows = forecaster.forecast(now_clients, 20.0, 2).unwrap();
        let (_, next) = workload.ticks().nth(3).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], next[0].demand);

        // Near the end the horizon shortens, past it there is nothing.
        assert_eq!(forecaster.forecast(now_clients, 280.0, 3).unwrap().len(), 1);
        assert!(forecaster.forecast(now_clients, 290.0, 3).is_none());
    }

    #[test]
    fn statistics_match_noiseless_steady_load() {
        let workload = Workload::generate(&WorkloadConfig {
            noise: 0.0,
            ..config(Pattern::Steady)
        })
        .unwrap();
        let stats = workload.statistics(100.0);

        assert_eq!(stats.num_steps, 30);
        assert!((stats.total_demand_mean - 144.0).abs() < 1e-9);
        assert!(stats.total_demand_std < 1e-9);
        assert!((stats.premium_demand_mean - 44.0).abs() < 1e-9);
        assert!(stats.hard_sla_feasible);
    }
}

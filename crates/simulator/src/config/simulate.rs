use std::path::PathBuf;

use clap::Parser;

use crate::metrics::MetricsFormat;
use crate::workload::Pattern;
use crate::workload::WorkloadConfig;

#[derive(Parser, Clone, Debug)]
pub struct SimulateArgs {
    #[arg(
        long,
        env = "RATESIM_CONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Controller configuration file, YAML or JSON; defaults apply when omitted"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Pattern::Steady, help = "Demand pattern")]
    pub pattern: Pattern,

    #[arg(long, default_value_t = 300.0, help = "Simulated duration in seconds")]
    pub duration: f64,

    #[arg(long, default_value_t = 10.0, help = "Seconds between controller ticks")]
    pub time_step: f64,

    #[arg(
        long,
        default_value_t = 0.1,
        help = "Std of the multiplicative demand noise"
    )]
    pub noise: f64,

    #[arg(long, default_value_t = 42, help = "Workload RNG seed")]
    pub seed: u64,

    #[arg(long, help = "Override the configured capacity")]
    pub capacity: Option<f64>,

    #[arg(
        long,
        env = "RATESIM_METRICS_FILE",
        value_hint = clap::ValueHint::FilePath,
        help = "Per-tick metrics output, e.g. /tmp/ratesim/metrics.log"
    )]
    pub metrics_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = MetricsFormat::Influx, help = "Metrics line format")]
    pub metrics_format: MetricsFormat,

    #[arg(
        long,
        help = "Also run a static token bucket and a plain per-tick LP on the same workload"
    )]
    pub compare: bool,
}

impl From<&SimulateArgs> for WorkloadConfig {
    fn from(args: &SimulateArgs) -> Self {
        Self {
            duration: args.duration,
            time_step: args.time_step,
            pattern: args.pattern,
            noise: args.noise,
            seed: args.seed,
        }
    }
}

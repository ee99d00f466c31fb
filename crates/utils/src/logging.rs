//! provides logging helpers

use std::path::Path;

use tracing::Subscriber;
use tracing_appender::rolling;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Directory for daily-rotated log files; logs go to stderr when unset.
pub const LOG_PATH_ENV_VAR: &str = "RATESIM_LOG_PATH";

const LOG_FILE_PREFIX: &str = "ratesim.log";

pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Human-readable fmt layer, writing to `log_path` if given, stderr otherwise.
pub fn get_fmt_layer<S>(log_path: Option<impl AsRef<Path>>) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match log_path {
        Some(dir) => layer()
            .with_writer(rolling::daily(dir.as_ref(), LOG_FILE_PREFIX))
            .with_ansi(false)
            .with_target(true)
            .boxed(),
        None => layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    }
}

/// `RUST_LOG`-style filter defaulting to INFO.
pub fn env_filter() -> filter::EnvFilter {
    filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy()
}

/// initiate the global tracing subscriber
pub fn init() {
    let log_path = std::env::var(LOG_PATH_ENV_VAR).ok();
    let fmt_layer = get_fmt_layer(log_path).with_filter(env_filter());

    registry().with(fmt_layer).init();
}

//! Tracing setup for the simulator: human logs plus a metrics file layer.

use std::fmt::{self};
use std::path::Path;

use tracing::field::Field;
use tracing::field::Visit;
use tracing::Event;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::FilterExt;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::FormatFields;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;
use tracing_subscriber::registry::LookupSpan;
use utils::logging::BoxedLayer;
use utils::logging::LOG_PATH_ENV_VAR;

use crate::metrics::METRICS_TARGET;

/// Writes the pre-encoded `msg` field of a metrics event verbatim.
struct MetricsLineFormatter;

#[derive(Default)]
struct LineVisitor {
    line: Option<String>,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "msg" {
            self.line = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "msg" {
            self.line = Some(format!("{value:?}"));
        }
    }
}

impl<S, N> FormatEvent<S, N> for MetricsLineFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        match visitor.line {
            Some(line) => writeln!(writer, "{}", line.trim_end()),
            None => Ok(()),
        }
    }
}

fn is_metrics(metadata: &tracing::Metadata<'_>) -> bool {
    metadata.target() == METRICS_TARGET
}

fn metrics_layer<S>(metrics_file: &Path) -> (BoxedLayer<S>, WorkerGuard)
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let dir = metrics_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let prefix = metrics_file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("metrics.log");

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(prefix)
        .build(dir);

    let (writer, guard) = match appender {
        Ok(appender) => tracing_appender::non_blocking(appender),
        Err(e) => {
            eprintln!(
                "failed to open metrics file {}: {e}, writing metrics to stdout",
                metrics_file.display()
            );
            tracing_appender::non_blocking(std::io::stdout())
        }
    };

    let layer = layer()
        .event_format(MetricsLineFormatter)
        .fmt_fields(tracing_subscriber::fmt::format::DefaultFields::new())
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(filter::filter_fn(is_metrics))
        .boxed();
    (layer, guard)
}

/// initiate the global tracing subscriber
///
/// Metric lines are only written when `metrics_file` is given; the returned
/// guard must be held until the run finishes.
pub fn init(metrics_file: Option<&Path>) -> Option<WorkerGuard> {
    let log_path = std::env::var(LOG_PATH_ENV_VAR).ok();
    let fmt_layer = utils::logging::get_fmt_layer(log_path).with_filter(
        utils::logging::env_filter().and(filter::filter_fn(|metadata| !is_metrics(metadata))),
    );

    match metrics_file {
        Some(path) => {
            let (metrics_layer, guard) = metrics_layer(path);
            registry().with(fmt_layer).with(metrics_layer).init();
            Some(guard)
        }
        None => {
            registry().with(fmt_layer).init();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::Registry;

    use super::*;

    #[test]
    fn metrics_lines_are_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.log");
        let (layer, guard) = metrics_layer::<Registry>(&path);
        let subscriber = registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: METRICS_TARGET, msg = %"tick,pattern=steady allocated=10 1\n");
            tracing::info!("ordinary log line");
        });
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "tick,pattern=steady allocated=10 1\n");
    }
}

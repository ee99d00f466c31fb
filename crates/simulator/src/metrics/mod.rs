//! Per-tick metrics lines, emitted on the `metrics` tracing target.

use allocator::Client;
use allocator::Solution;

pub mod encoders;

pub use encoders::create_encoder;
pub use encoders::Fields;
pub use encoders::MetricsEncoder;
pub use encoders::MetricsFormat;
pub use encoders::Tags;

/// Tracing target routed to the metrics file.
pub const METRICS_TARGET: &str = "metrics";

/// Simulated seconds to line-protocol nanoseconds.
pub fn to_nanos(seconds: f64) -> i64 {
    (seconds * 1e9).round() as i64
}

/// Encode the controller view of one tick plus one line per client.
pub fn encode_tick(
    encoder: &dyn MetricsEncoder,
    pattern: &str,
    clients: &[Client],
    solution: &Solution,
    now: f64,
) -> Vec<String> {
    let timestamp = to_nanos(now);
    let mut tags = Tags::new();
    tags.insert("pattern".to_string(), pattern.to_string());

    let demand: f64 = clients.iter().map(|c| c.demand).sum();
    let mut fields = Fields::new();
    fields.insert("period".to_string(), solution.period.into());
    fields.insert("cached".to_string(), (solution.timestamp != now).into());
    fields.insert("reason".to_string(), solution.reason.as_str().into());
    fields.insert("warm_started".to_string(), solution.warm_started.into());
    fields.insert("shadow_price".to_string(), solution.shadow_price.into());
    fields.insert("smoothed_price".to_string(), solution.smoothed_price.into());
    fields.insert("objective".to_string(), solution.objective_value.into());
    fields.insert("demand".to_string(), demand.into());
    fields.insert("allocated".to_string(), solution.total_allocated().into());
    fields.insert("effective_capacity".to_string(), solution.capacity.effective.into());
    fields.insert("buffer".to_string(), solution.capacity.buffer.into());
    fields.insert("utilization".to_string(), solution.utilization().into());
    fields.insert(
        "solve_time_us".to_string(),
        (solution.solve_time.as_micros() as u64).into(),
    );

    let mut lines = vec![encoder.encode_metrics("allocation_tick", &tags, &fields, timestamp)];

    for client in clients {
        let allocated = solution.rate(&client.id).unwrap_or(0.0);
        let mut client_tags = tags.clone();
        client_tags.insert("client".to_string(), client.id.clone());

        let mut client_fields = Fields::new();
        client_fields.insert("demand".to_string(), client.demand.into());
        client_fields.insert("allocated".to_string(), allocated.into());
        client_fields.insert(
            "ratio".to_string(),
            allocator::allocation_ratio(client.demand, allocated).into(),
        );
        lines.push(encoder.encode_metrics(
            "client_allocation",
            &client_tags,
            &client_fields,
            timestamp,
        ));
    }

    lines
}

/// Write metric lines to the metrics target.
pub fn emit(lines: &[String]) {
    for line in lines {
        tracing::info!(target: METRICS_TARGET, msg = %line);
    }
}

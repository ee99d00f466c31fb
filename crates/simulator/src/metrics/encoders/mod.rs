use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

pub mod influx;
pub mod json;

/// A field value that can be encoded in metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldValue {
    String(String),
    UnsignedInteger(u64),
    Float(f64),
    Boolean(bool),
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::UnsignedInteger(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

pub type Tags = BTreeMap<String, String>;
pub type Fields = BTreeMap<String, FieldValue>;

/// Encodes one measurement into a line of the metrics file
pub trait MetricsEncoder: Send + Sync {
    fn encode_metrics(&self, measurement: &str, tags: &Tags, fields: &Fields, timestamp: i64)
        -> String;
}

/// Output format of the metrics file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    #[default]
    Influx,
    Json,
}

pub fn create_encoder(format: MetricsFormat) -> Box<dyn MetricsEncoder> {
    match format {
        MetricsFormat::Influx => Box::new(influx::InfluxEncoder),
        MetricsFormat::Json => Box::new(json::JsonEncoder),
    }
}

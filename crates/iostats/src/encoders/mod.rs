use std::collections::BTreeMap;

pub mod influx;
pub mod json;

/// Field name carrying the gauge value in every encoded record.
pub const VALUE_FIELD: &str = "value";

/// Trait for encoding gauge samples into different output formats
pub trait MetricsEncoder: Send + Sync {
    /// Encode one gauge sample as a newline terminated record
    fn encode_gauge(
        &self,
        name: &str,
        tags: &BTreeMap<String, String>,
        value: f64,
        timestamp: i64,
    ) -> String;
}

/// Factory function to create encoders based on format string
pub fn create_encoder(format: &str) -> Box<dyn MetricsEncoder> {
    match format.to_lowercase().as_str() {
        "json" => Box::new(json::JsonEncoder::new()),
        _ => Box::new(influx::InfluxEncoder::new()),
    }
}

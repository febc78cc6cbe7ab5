use std::collections::BTreeMap;

use influxdb_line_protocol::LineProtocolBuilder;

use super::MetricsEncoder;
use super::VALUE_FIELD;

/// InfluxDB line protocol encoder
pub struct InfluxEncoder;

impl InfluxEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InfluxEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsEncoder for InfluxEncoder {
    fn encode_gauge(
        &self,
        name: &str,
        tags: &BTreeMap<String, String>,
        value: f64,
        timestamp: i64,
    ) -> String {
        let mut builder = LineProtocolBuilder::new().measurement(name);
        for (key, tag_value) in tags {
            builder = builder.tag(key, tag_value);
        }

        let line = builder
            .field(VALUE_FIELD, value)
            .timestamp(timestamp)
            .close_line()
            .build();
        String::from_utf8_lossy(&line).into_owned()
    }
}

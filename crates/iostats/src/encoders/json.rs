use std::collections::BTreeMap;

use serde_json::json;

use super::MetricsEncoder;
use super::VALUE_FIELD;

/// JSON encoder for metrics, one object per line
pub struct JsonEncoder;

impl JsonEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsEncoder for JsonEncoder {
    fn encode_gauge(
        &self,
        name: &str,
        tags: &BTreeMap<String, String>,
        value: f64,
        timestamp: i64,
    ) -> String {
        // non-finite values have no JSON representation
        let value = serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null);

        let metrics = json!({
            "measure": name,
            "ts": timestamp,
            "tag": tags,
            "field": { VALUE_FIELD: value },
        });
        metrics.to_string() + "\n"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    #[test]
    fn test_encode_gauge_basic() {
        let encoder = JsonEncoder::new();
        let tags = BTreeMap::from([("device".to_string(), "C:".to_string())]);

        let result = encoder.encode_gauge("system.io.rkb_s", &tags, 85.5, 1609459200);
        assert!(result.ends_with('\n'));

        let parsed: Value = serde_json::from_str(&result).expect("Should be valid JSON");
        assert_eq!(parsed["measure"], "system.io.rkb_s");
        assert_eq!(parsed["ts"], 1609459200);
        assert_eq!(parsed["tag"]["device"], "C:");
        assert_eq!(parsed["field"]["value"], 85.5);
    }

    #[test]
    fn test_non_finite_value_becomes_null() {
        let encoder = JsonEncoder::new();
        let result = encoder.encode_gauge("system.io.r_s", &BTreeMap::new(), f64::NAN, 0);

        let parsed: Value = serde_json::from_str(&result).unwrap();
        assert!(parsed["field"]["value"].is_null());
    }
}

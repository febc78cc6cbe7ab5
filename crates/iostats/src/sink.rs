//! Metric sinks collecting the gauges of one cycle.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Context;
use anyhow::Result;
use chrono::Utc;

use crate::encoders::MetricsEncoder;

/// Outgoing metric batch.
///
/// `emit` only appends to the batch; nothing leaves the process before
/// `commit`, which is called exactly once per cycle.
pub trait MetricSink {
    fn emit(&mut self, name: &str, value: f64, tags: &[String]);

    fn commit(&mut self) -> Result<()>;
}

/// Encodes every gauge on `emit` and writes the whole batch to `writer` on
/// `commit`.
pub struct EncodedSink<W> {
    encoder: Box<dyn MetricsEncoder>,
    writer: W,
    pending: Vec<String>,
}

impl<W: Write> EncodedSink<W> {
    pub fn new(encoder: Box<dyn MetricsEncoder>, writer: W) -> Self {
        Self {
            encoder,
            writer,
            pending: Vec::new(),
        }
    }

    /// Number of records waiting for the next commit.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Splits `key:value` tags; tags without a value are dropped.
fn tag_map(tags: &[String]) -> BTreeMap<String, String> {
    tags.iter()
        .filter_map(|tag| match tag.split_once(':') {
            Some((key, value)) if !key.is_empty() && !value.is_empty() => {
                Some((key.to_string(), value.to_string()))
            }
            _ => {
                tracing::debug!(tag = %tag, "dropping tag without a value");
                None
            }
        })
        .collect()
}

impl<W: Write> MetricSink for EncodedSink<W> {
    fn emit(&mut self, name: &str, value: f64, tags: &[String]) {
        let record =
            self.encoder
                .encode_gauge(name, &tag_map(tags), value, Utc::now().timestamp_millis());
        self.pending.push(record);
    }

    /// Writes the batch with a single `write_all`. On failure the records stay
    /// pending and the next commit writes them again.
    fn commit(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = self.pending.concat();
        self.writer
            .write_all(batch.as_bytes())
            .context("write metric batch")?;
        self.writer.flush().context("flush metric writer")?;
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::encoders::create_encoder;

    #[test]
    fn nothing_is_written_before_commit() {
        let mut sink = EncodedSink::new(create_encoder("influx"), Vec::new());
        sink.emit("system.io.r_s", 3.0, &["device:C:".to_string()]);
        sink.emit("system.io.w_s", 1.0, &["device:C:".to_string()]);

        assert_eq!(sink.pending(), 2);
        assert!(sink.writer.is_empty());

        sink.commit().unwrap();
        assert_eq!(sink.pending(), 0);

        let written = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("system.io.r_s,device=C: value=3"));
        assert!(lines[1].starts_with("system.io.w_s,device=C: value=1"));
    }

    #[derive(Default)]
    struct FlakyWriter {
        failing: bool,
        written: Vec<u8>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.failing {
                return Err(std::io::Error::other("disk full"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_commit_keeps_the_whole_batch() {
        let writer = FlakyWriter {
            failing: true,
            ..Default::default()
        };
        let mut sink = EncodedSink::new(create_encoder("influx"), writer);
        sink.emit("system.io.r_s", 3.0, &["device:C:".to_string()]);
        sink.emit("system.io.w_s", 1.0, &["device:C:".to_string()]);

        let err = sink.commit().unwrap_err();
        assert!(format!("{err:#}").contains("disk full"));
        assert_eq!(sink.pending(), 2);
        assert!(sink.writer.written.is_empty());

        sink.writer.failing = false;
        sink.commit().unwrap();
        assert_eq!(sink.pending(), 0);

        let written = String::from_utf8(sink.into_inner().written).unwrap();
        assert_eq!(written.lines().count(), 2);
    }

    #[test]
    fn empty_commit_writes_nothing() {
        let mut sink = EncodedSink::new(create_encoder("json"), Vec::new());
        sink.commit().unwrap();
        assert!(sink.into_inner().is_empty());
    }

    #[test]
    fn device_tag_keeps_colons_in_value() {
        let tags = tag_map(&["device:C:".to_string(), "bare".to_string()]);
        assert_eq!(
            tags,
            BTreeMap::from([("device".to_string(), "C:".to_string())])
        );
    }
}

//! Derives per-second rates from two consecutive counter snapshots.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::snapshot::CounterSnapshot;

const BYTES_PER_KB: f64 = 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RateError {
    #[error("divide by zero: frequency reference is zero")]
    ZeroFrequency,

    #[error("divide by zero: no ticks elapsed between samples")]
    ZeroElapsedTime,

    #[error("timestamp went backwards from {previous} to {current} ticks")]
    ClockWentBackwards { previous: u64, current: u64 },
}

/// How a counter that went down between two samples is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CounterReset {
    /// Treat the delta as zero.
    #[default]
    Saturate,
    /// Let the unsigned subtraction wrap around. A reset then shows up as a
    /// huge spike, which is what plain unsigned counter arithmetic produces.
    Wrap,
}

impl CounterReset {
    fn delta(self, previous: u64, current: u64) -> u64 {
        match self {
            CounterReset::Saturate => current.saturating_sub(previous),
            CounterReset::Wrap => current.wrapping_sub(previous),
        }
    }
}

/// The five metrics produced for every device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IoMetric {
    WriteKbPerSec,
    WritesPerSec,
    ReadKbPerSec,
    ReadsPerSec,
    AvgQueueSize,
}

impl IoMetric {
    pub const ALL: [IoMetric; 5] = [
        IoMetric::WriteKbPerSec,
        IoMetric::WritesPerSec,
        IoMetric::ReadKbPerSec,
        IoMetric::ReadsPerSec,
        IoMetric::AvgQueueSize,
    ];

    /// Metric name without the namespace prefix.
    pub fn suffix(self) -> &'static str {
        match self {
            IoMetric::WriteKbPerSec => "io.wkb_s",
            IoMetric::WritesPerSec => "io.w_s",
            IoMetric::ReadKbPerSec => "io.rkb_s",
            IoMetric::ReadsPerSec => "io.r_s",
            IoMetric::AvgQueueSize => "io.avg_q_sz",
        }
    }

    pub fn name(self, prefix: &str) -> String {
        format!("{prefix}.{}", self.suffix())
    }
}

impl fmt::Display for IoMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMetrics {
    pub write_kb_per_sec: f64,
    pub writes_per_sec: f64,
    pub read_kb_per_sec: f64,
    pub reads_per_sec: f64,
    pub avg_queue_size: f64,
}

impl DerivedMetrics {
    pub fn get(&self, metric: IoMetric) -> f64 {
        match metric {
            IoMetric::WriteKbPerSec => self.write_kb_per_sec,
            IoMetric::WritesPerSec => self.writes_per_sec,
            IoMetric::ReadKbPerSec => self.read_kb_per_sec,
            IoMetric::ReadsPerSec => self.reads_per_sec,
            IoMetric::AvgQueueSize => self.avg_queue_size,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (IoMetric, f64)> + '_ {
        IoMetric::ALL.into_iter().map(|metric| (metric, self.get(metric)))
    }
}

/// Stateless delta-to-rate computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateEngine {
    counter_reset: CounterReset,
}

impl RateEngine {
    pub fn new(counter_reset: CounterReset) -> Self {
        Self { counter_reset }
    }

    pub fn compute_rates(
        &self,
        previous: &CounterSnapshot,
        current: &CounterSnapshot,
    ) -> Result<DerivedMetrics, RateError> {
        let frequency = previous.frequency_ticks_per_sec;
        if frequency == 0 {
            return Err(RateError::ZeroFrequency);
        }

        let elapsed_ticks = current
            .timestamp_ticks
            .checked_sub(previous.timestamp_ticks)
            .ok_or(RateError::ClockWentBackwards {
                previous: previous.timestamp_ticks,
                current: current.timestamp_ticks,
            })?;
        if elapsed_ticks == 0 {
            return Err(RateError::ZeroElapsedTime);
        }

        let elapsed_secs = elapsed_ticks as f64 / frequency as f64;
        tracing::trace!(
            device = %current.device_id,
            elapsed_ticks,
            elapsed_secs,
            "computing rates"
        );

        let per_sec = |previous: u64, current: u64| {
            self.counter_reset.delta(previous, current) as f64 / elapsed_secs
        };

        Ok(DerivedMetrics {
            write_kb_per_sec: per_sec(previous.write_bytes_rate, current.write_bytes_rate)
                / BYTES_PER_KB,
            writes_per_sec: per_sec(previous.write_ops_rate, current.write_ops_rate),
            read_kb_per_sec: per_sec(previous.read_bytes_rate, current.read_bytes_rate)
                / BYTES_PER_KB,
            reads_per_sec: per_sec(previous.read_ops_rate, current.read_ops_rate),
            // queue length is a gauge, but it goes through the same delta
            // computation as the cumulative counters
            avg_queue_size: per_sec(previous.queue_length, current.queue_length),
        })
    }
}

/// [`RateEngine::compute_rates`] with the default counter reset policy.
pub fn compute_rates(
    previous: &CounterSnapshot,
    current: &CounterSnapshot,
) -> Result<DerivedMetrics, RateError> {
    RateEngine::default().compute_rates(previous, current)
}

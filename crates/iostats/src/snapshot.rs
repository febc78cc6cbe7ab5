use serde::Serialize;

/// Raw counters of one logical storage device, read once per poll.
///
/// The `*_rate` fields carry the names the OS performance counters use, but
/// they hold cumulative values. Rates only exist as the delta between two
/// snapshots, see [`crate::rates`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub device_id: String,
    /// instantaneous queue depth at sample time
    pub queue_length: u64,
    pub read_bytes_rate: u64,
    pub read_ops_rate: u64,
    pub write_bytes_rate: u64,
    pub write_ops_rate: u64,
    /// monotonic tick count at sample time
    pub timestamp_ticks: u64,
    /// ticks per second, re-read with every sample
    pub frequency_ticks_per_sec: u64,
}

impl CounterSnapshot {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Default::default()
        }
    }

    pub fn with_timing(mut self, timestamp_ticks: u64, frequency_ticks_per_sec: u64) -> Self {
        self.timestamp_ticks = timestamp_ticks;
        self.frequency_ticks_per_sec = frequency_ticks_per_sec;
        self
    }

    pub fn with_reads(mut self, bytes: u64, ops: u64) -> Self {
        self.read_bytes_rate = bytes;
        self.read_ops_rate = ops;
        self
    }

    pub fn with_writes(mut self, bytes: u64, ops: u64) -> Self {
        self.write_bytes_rate = bytes;
        self.write_ops_rate = ops;
        self
    }

    pub fn with_queue_length(mut self, queue_length: u64) -> Self {
        self.queue_length = queue_length;
        self
    }
}

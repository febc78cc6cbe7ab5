use std::collections::HashMap;

use crate::snapshot::CounterSnapshot;

/// Last known snapshot per device.
///
/// Entries are created on the first snapshot of a device and overwritten on
/// every poll after that. Nothing is ever evicted: a device that leaves the
/// enumeration keeps its stale entry, which is only read again if the same id
/// shows up later. The number of entries is bounded by the number of distinct
/// devices seen by the process.
#[derive(Debug, Default)]
pub struct SampleStore {
    samples: HashMap<String, CounterSnapshot>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, device_id: &str) -> Option<&CounterSnapshot> {
        self.samples.get(device_id)
    }

    /// Overwrites the entry for `device_id`, returning the replaced snapshot.
    pub fn put(
        &mut self,
        device_id: impl Into<String>,
        snapshot: CounterSnapshot,
    ) -> Option<CounterSnapshot> {
        self.samples.insert(device_id.into(), snapshot)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.samples.keys().map(String::as_str)
    }
}

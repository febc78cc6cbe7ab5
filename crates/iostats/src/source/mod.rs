//! Counter sources the check reads devices and snapshots from.

pub mod procfs;

use anyhow::Result;

use crate::snapshot::CounterSnapshot;

pub use procfs::ProcDiskstats;

/// The operating environment as seen by a check.
pub trait DiskSource {
    /// Lists the fixed drives of the host.
    fn list_fixed_drives(&self) -> Result<Vec<String>>;

    /// Reads raw counters of all devices in one batched query.
    fn query_counter_snapshots(&self) -> Result<Vec<CounterSnapshot>>;

    /// Basic shape check on a device identifier. Only short drive
    /// identifiers such as `C:` pass by default.
    fn is_device_name(&self, name: &str) -> bool {
        !name.is_empty() && name.len() <= 3
    }
}

//! Linux source backed by `/proc/diskstats` and `/sys/block`.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use anyhow::Result;

use super::DiskSource;
use crate::snapshot::CounterSnapshot;

/// Snapshot timestamps are in 100ns ticks.
pub const TICKS_PER_SEC: u64 = 10_000_000;

const SECTOR_SIZE: u64 = 512;
const MAX_DEVICE_NAME_LEN: usize = 32;
const VIRTUAL_DEVICE_PREFIXES: [&str; 3] = ["loop", "ram", "zram"];

pub struct ProcDiskstats {
    root: PathBuf,
    started: Instant,
}

impl Default for ProcDiskstats {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcDiskstats {
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Reads `proc/diskstats` and `sys/block` below `root` instead of `/`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            started: Instant::now(),
        }
    }

    fn ticks(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_nanos() / 100).unwrap_or(u64::MAX)
    }
}

impl DiskSource for ProcDiskstats {
    fn list_fixed_drives(&self) -> Result<Vec<String>> {
        let block_dir = self.root.join("sys/block");
        let entries = fs::read_dir(&block_dir)
            .with_context(|| format!("read block device directory {}", block_dir.display()))?;

        let mut drives = Vec::new();
        for entry in entries {
            let entry = entry.context("read block device entry")?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if VIRTUAL_DEVICE_PREFIXES
                .iter()
                .any(|prefix| name.starts_with(prefix))
            {
                continue;
            }
            if is_removable(&entry.path()) {
                tracing::debug!(device = %name, "skipping removable device");
                continue;
            }
            drives.push(name);
        }
        drives.sort_unstable();
        Ok(drives)
    }

    fn query_counter_snapshots(&self) -> Result<Vec<CounterSnapshot>> {
        let path = self.root.join("proc/diskstats");
        let content =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        parse_diskstats(&content, self.ticks())
    }

    fn is_device_name(&self, name: &str) -> bool {
        !name.is_empty() && name.len() <= MAX_DEVICE_NAME_LEN && !name.contains('/')
    }
}

fn is_removable(device_dir: &Path) -> bool {
    fs::read_to_string(device_dir.join("removable"))
        .map(|value| value.trim() == "1")
        .unwrap_or(false)
}

/// Parses the content of `/proc/diskstats`, stamping every row with the same
/// tick count.
///
/// Counters keep their full 64-bit width; the kernel reports them as
/// `unsigned long` and they pass 2^32 on busy disks.
pub fn parse_diskstats(content: &str, timestamp_ticks: u64) -> Result<Vec<CounterSnapshot>> {
    let mut snapshots = Vec::new();
    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 14 {
            if !fields.is_empty() {
                tracing::trace!(line, "skipping short diskstats line");
            }
            continue;
        }

        let name = fields[2];
        let counter = |index: usize| -> Result<u64> {
            fields[index]
                .parse::<u64>()
                .with_context(|| format!("parse diskstats field {index} of {name}"))
        };

        snapshots.push(CounterSnapshot {
            device_id: name.to_string(),
            queue_length: counter(11)?,
            read_bytes_rate: counter(5)?.wrapping_mul(SECTOR_SIZE),
            read_ops_rate: counter(3)?,
            write_bytes_rate: counter(9)?.wrapping_mul(SECTOR_SIZE),
            write_ops_rate: counter(7)?,
            timestamp_ticks,
            frequency_ticks_per_sec: TICKS_PER_SEC,
        });
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;
    use tempfile::TempDir;

    use super::*;

    const DISKSTATS: &str = "\
   7       0 loop0 12 0 24 3 0 0 0 0 0 8 3 0 0 0 0
   8       0 sda 1500 20 30000 900 700 40 8000 1200 3 2100 2100 0 0 0 0
   8       1 sda1 1400 20 29000 880 690 40 7900 1190 0 2000 2070 0 0 0 0
 259       0 nvme0n1 42 0 84 5 7 0 56 2 1 9 7
";

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn parses_counters_and_converts_sectors() {
        let snapshots = parse_diskstats(DISKSTATS, 77).unwrap();
        assert_eq!(snapshots.len(), 4);

        let sda = snapshots.iter().find(|s| s.device_id == "sda").unwrap();
        assert_eq!(
            sda,
            &CounterSnapshot {
                device_id: "sda".to_string(),
                queue_length: 3,
                read_bytes_rate: 30000 * 512,
                read_ops_rate: 1500,
                write_bytes_rate: 8000 * 512,
                write_ops_rate: 700,
                timestamp_ticks: 77,
                frequency_ticks_per_sec: TICKS_PER_SEC,
            }
        );
    }

    #[test]
    fn op_counters_past_u32_range_keep_their_rate() {
        let before = "8 0 sda 4294967290 0 0 0 4294967000 0 0 0 4294967296 0 0\n";
        let after = "8 0 sda 4294967300 0 0 0 4294967020 0 0 0 4294967300 0 0\n";

        let previous = parse_diskstats(before, 0).unwrap().remove(0);
        let current = parse_diskstats(after, TICKS_PER_SEC).unwrap().remove(0);
        assert_eq!(current.read_ops_rate, 4_294_967_300);

        let rates = crate::rates::compute_rates(&previous, &current).unwrap();
        assert!((rates.reads_per_sec - 10.0).abs() < 1e-9);
        assert!((rates.writes_per_sec - 20.0).abs() < 1e-9);
        assert!((rates.avg_queue_size - 4.0).abs() < 1e-9);
    }

    #[test]
    fn skips_short_lines() {
        let snapshots = parse_diskstats("\n   8 0 sdb 1 2 3\n", 0).unwrap();
        assert!(snapshots.is_empty());
    }

    #[test]
    fn malformed_counter_is_an_error() {
        let line = "8 0 sda x 0 0 0 0 0 0 0 0 0 0\n";
        let err = parse_diskstats(line, 0).unwrap_err();
        assert!(err.to_string().contains("sda"));
    }

    #[test]
    fn lists_fixed_whole_disks_only() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "sys/block/sda/removable", "0\n");
        write(dir.path(), "sys/block/nvme0n1/removable", "0\n");
        write(dir.path(), "sys/block/sdb/removable", "1\n");
        write(dir.path(), "sys/block/loop0/removable", "0\n");
        write(dir.path(), "sys/block/zram0/removable", "0\n");
        fs::create_dir_all(dir.path().join("sys/block/dm-0")).unwrap();

        let source = ProcDiskstats::with_root(dir.path());
        assert_eq!(
            source.list_fixed_drives().unwrap(),
            ["dm-0", "nvme0n1", "sda"].map(String::from).to_vec()
        );
    }

    #[test]
    fn missing_block_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let source = ProcDiskstats::with_root(dir.path());
        assert!(source.list_fixed_drives().is_err());
    }

    #[test]
    fn queries_snapshots_from_root() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "proc/diskstats", DISKSTATS);

        let source = ProcDiskstats::with_root(dir.path());
        let first = source.query_counter_snapshots().unwrap();
        let second = source.query_counter_snapshots().unwrap();

        assert_eq!(first.len(), 4);
        assert!(second[0].timestamp_ticks >= first[0].timestamp_ticks);
    }

    #[test]
    fn accepts_linux_device_names() {
        let source = ProcDiskstats::new();
        assert!(source.is_device_name("nvme0n1"));
        assert!(!source.is_device_name(""));
        assert!(!source.is_device_name("cciss/c0d0"));
    }
}

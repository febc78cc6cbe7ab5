//! Per-device disk I/O rate sampling.
//!
//! An [`IoCheck`] reads cumulative disk counters from a [`DiskSource`] once
//! per cycle, keeps the last snapshot of every device in a [`SampleStore`] and
//! emits per-second rates derived from consecutive snapshots to a
//! [`MetricSink`]. Scheduling the cycles is left to the host.

pub mod check;
pub mod config;
pub mod encoders;
pub mod filter;
pub mod logging;
pub mod rates;
pub mod sink;
pub mod snapshot;
pub mod source;
pub mod store;

pub use check::CheckError;
pub use check::CheckOptions;
pub use check::CycleReport;
pub use check::IoCheck;
pub use filter::should_track;
pub use filter::DeviceFilter;
pub use rates::compute_rates;
pub use rates::CounterReset;
pub use rates::DerivedMetrics;
pub use rates::RateError;
pub use sink::MetricSink;
pub use snapshot::CounterSnapshot;
pub use source::DiskSource;
pub use store::SampleStore;

//! The I/O statistics check: one poll cycle per [`IoCheck::run`].

use std::collections::HashSet;

use thiserror::Error;

use crate::filter::should_track;
use crate::filter::DeviceFilter;
use crate::rates::CounterReset;
use crate::rates::IoMetric;
use crate::rates::RateEngine;
use crate::sink::MetricSink;
use crate::snapshot::CounterSnapshot;
use crate::source::DiskSource;
use crate::store::SampleStore;

pub const DEFAULT_METRIC_PREFIX: &str = "system";

/// Cycle level failures. The cycle is abandoned and nothing is committed.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("failed to enumerate devices")]
    Enumeration(#[source] anyhow::Error),

    #[error("failed to query counter snapshots")]
    SnapshotQuery(#[source] anyhow::Error),

    #[error("failed to commit metric batch")]
    Commit(#[source] anyhow::Error),
}

pub struct CheckOptions {
    /// Devices matching this filter are never sampled.
    pub exclude: Option<Box<dyn DeviceFilter>>,
    pub metric_prefix: String,
    pub counter_reset: CounterReset,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            exclude: None,
            metric_prefix: DEFAULT_METRIC_PREFIX.to_string(),
            counter_reset: CounterReset::default(),
        }
    }
}

/// What happened to the tracked devices during one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub tracked: usize,
    /// devices seen for the first time, stored without emitting
    pub first_seen: usize,
    pub emitted: usize,
    /// devices whose rates could not be computed this cycle
    pub skipped: usize,
    /// tracked devices the snapshot query returned no row for
    pub missing: usize,
}

pub struct IoCheck<S> {
    source: S,
    exclude: Option<Box<dyn DeviceFilter>>,
    engine: RateEngine,
    metric_names: [String; 5],
    store: SampleStore,
}

impl<S: DiskSource> IoCheck<S> {
    pub fn configure(options: CheckOptions, source: S) -> Self {
        let prefix = options.metric_prefix;
        Self {
            source,
            exclude: options.exclude,
            engine: RateEngine::new(options.counter_reset),
            metric_names: IoMetric::ALL.map(|metric| metric.name(&prefix)),
            store: SampleStore::new(),
        }
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    /// Runs one cycle and commits the batch to `sink`.
    ///
    /// Per-device rate errors only skip that device. Enumeration and snapshot
    /// failures abort the cycle before anything is committed.
    pub fn run(&mut self, sink: &mut dyn MetricSink) -> Result<CycleReport, CheckError> {
        let candidates = self
            .source
            .list_fixed_drives()
            .map_err(CheckError::Enumeration)?;

        let tracked: HashSet<String> = candidates
            .into_iter()
            .filter(|name| self.is_tracked(name))
            .collect();

        let mut report = CycleReport {
            tracked: tracked.len(),
            ..Default::default()
        };

        if !tracked.is_empty() {
            let snapshots = self
                .source
                .query_counter_snapshots()
                .map_err(CheckError::SnapshotQuery)?;

            let mut seen = HashSet::with_capacity(tracked.len());
            for current in snapshots {
                if !tracked.contains(&current.device_id) {
                    continue;
                }
                if !seen.insert(current.device_id.clone()) {
                    tracing::debug!(device = %current.device_id, "ignoring duplicate counter row");
                    continue;
                }
                self.process(current, sink, &mut report);
            }

            for device in tracked.difference(&seen) {
                tracing::debug!(device = %device, "no counters returned for device");
                report.missing += 1;
            }
        }

        sink.commit().map_err(CheckError::Commit)?;
        tracing::debug!(?report, "I/O check cycle finished");
        Ok(report)
    }

    fn is_tracked(&self, name: &str) -> bool {
        if !self.source.is_device_name(name) {
            tracing::trace!(device = %name, "skipping unexpected device name");
            return false;
        }
        if !should_track(name, self.exclude.as_deref()) {
            tracing::debug!(device = %name, "matched device against exclusion; skipping");
            return false;
        }
        true
    }

    fn process(
        &mut self,
        current: CounterSnapshot,
        sink: &mut dyn MetricSink,
        report: &mut CycleReport,
    ) {
        match self.store.get(&current.device_id) {
            None => {
                tracing::debug!(device = %current.device_id, "first sample of device, no baseline yet");
                report.first_seen += 1;
            }
            Some(previous) => match self.engine.compute_rates(previous, &current) {
                Ok(rates) => {
                    let tags = [format!("device:{}", current.device_id)];
                    for (name, (_, value)) in self.metric_names.iter().zip(rates.iter()) {
                        tracing::trace!(metric = %name, value, "setting gauge");
                        sink.emit(name, value, &tags);
                    }
                    report.emitted += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        device = %current.device_id,
                        error = %e,
                        "failed to compute I/O statistics"
                    );
                    report.skipped += 1;
                }
            },
        }

        self.store.put(current.device_id.clone(), current);
    }
}

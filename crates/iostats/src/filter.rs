//! device exclusion

use regex::Regex;

/// Decides whether a device should be left out of sampling.
pub trait DeviceFilter: Send + Sync {
    /// Returns `true` when `device_id` is excluded.
    fn excludes(&self, device_id: &str) -> bool;
}

impl DeviceFilter for Regex {
    fn excludes(&self, device_id: &str) -> bool {
        self.is_match(device_id)
    }
}

/// Adapts a plain predicate into a [`DeviceFilter`].
pub struct FilterFn<F>(pub F);

impl<F> DeviceFilter for FilterFn<F>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn excludes(&self, device_id: &str) -> bool {
        (self.0)(device_id)
    }
}

/// Returns `false` if an exclusion is present and matches `device_id`.
pub fn should_track(device_id: &str, exclusion: Option<&dyn DeviceFilter>) -> bool {
    match exclusion {
        Some(filter) => !filter.excludes(device_id),
        None => true,
    }
}

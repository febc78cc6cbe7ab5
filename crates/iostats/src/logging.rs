//! provides logging helpers

use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

/// initiate the global tracing subscriber, logging to stderr
pub fn init() {
    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy();

    let fmt_layer = layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter);

    registry().with(fmt_layer).init();
}

/// Builds a non-blocking writer for a daily rolling metrics file.
///
/// The returned guard flushes pending records when dropped and must be kept
/// alive for as long as the writer is in use.
pub fn metrics_writer(metrics_file: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    let dir = metrics_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file = metrics_file
        .file_name()
        .and_then(|name| name.to_str())
        .context("metrics file path has no valid file name")?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file)
        .max_log_files(3)
        .build(dir)
        .context("failed to create rolling file appender")?;

    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn metrics_writer_creates_rolling_file() {
        let dir = TempDir::new().unwrap();
        let (mut writer, guard) = metrics_writer(&dir.path().join("iostats.log")).unwrap();
        writer.write_all(b"system.io.r_s value=1 1\n").unwrap();
        drop(guard);

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("iostats.log"));
    }

    #[test]
    fn metrics_writer_rejects_directory_path() {
        assert!(metrics_writer(Path::new("/")).is_err());
    }
}

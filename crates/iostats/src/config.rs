use std::path::Path;
use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::check::CheckOptions;
use crate::rates::CounterReset;

#[derive(Parser)]
#[command(about, long_about, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the check periodically and write metrics to the metrics file
    Run(RunArgs),
    /// Sample twice and print the derived metrics to stdout
    Probe(ProbeArgs),
}

/// Options shared by every command that runs the check.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[arg(
        long,
        env = "IOSTATS_CONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to a YAML instance config, e.g. /etc/iostats/instance.yaml"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "IOSTATS_EXCLUDE",
        help = "Regular expression of device names to exclude, overrides device_blacklist_re"
    )]
    pub exclude: Option<String>,

    #[arg(long, help = "Namespace prepended to metric names [default: system]")]
    pub metric_prefix: Option<String>,

    #[arg(
        long,
        value_enum,
        help = "How a counter that went down is handled [default: saturate]"
    )]
    pub counter_reset: Option<CounterReset>,

    #[arg(long, default_value = "influx", help = "Metrics output format, influx or json")]
    pub metrics_format: String,

    #[arg(
        long,
        default_value = "/",
        value_hint = clap::ValueHint::DirPath,
        help = "Filesystem root containing proc/ and sys/"
    )]
    pub root: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub check: CheckArgs,

    #[arg(long, default_value = "15", help = "Seconds between two check cycles")]
    pub interval_secs: u64,

    #[arg(
        long,
        env = "IOSTATS_METRICS_FILE",
        value_hint = clap::ValueHint::FilePath,
        default_value = "logs/iostats.log",
        help = "Path of the rolling metrics file, e.g. /logs/iostats.log"
    )]
    pub metrics_file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub check: CheckArgs,

    #[arg(long, default_value = "1", help = "Seconds between the two samples")]
    pub interval_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid instance config")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid device exclusion pattern `{pattern}`")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Per-instance settings as found in a YAML instance file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    pub device_blacklist_re: Option<String>,
    pub metric_prefix: Option<String>,
    pub counter_reset: Option<CounterReset>,
}

impl InstanceConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        tracing::info!("Loading instance config from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn into_options(self) -> Result<CheckOptions, ConfigError> {
        let mut options = CheckOptions::default();
        if let Some(pattern) = self.device_blacklist_re.filter(|p| !p.is_empty()) {
            let regex = Regex::new(&pattern)
                .map_err(|source| ConfigError::Pattern { pattern, source })?;
            options.exclude = Some(Box::new(regex));
        }
        if let Some(prefix) = self.metric_prefix {
            options.metric_prefix = prefix;
        }
        if let Some(counter_reset) = self.counter_reset {
            options.counter_reset = counter_reset;
        }
        Ok(options)
    }
}

impl CheckArgs {
    /// Instance file values overridden by command line flags.
    pub fn instance_config(&self) -> Result<InstanceConfig, ConfigError> {
        let mut instance = match &self.config {
            Some(path) => InstanceConfig::load(path)?,
            None => InstanceConfig::default(),
        };
        if let Some(exclude) = &self.exclude {
            instance.device_blacklist_re = Some(exclude.clone());
        }
        if let Some(prefix) = &self.metric_prefix {
            instance.metric_prefix = Some(prefix.clone());
        }
        if let Some(counter_reset) = self.counter_reset {
            instance.counter_reset = Some(counter_reset);
        }
        Ok(instance)
    }

    pub fn check_options(&self) -> Result<CheckOptions, ConfigError> {
        self.instance_config()?.into_options()
    }
}

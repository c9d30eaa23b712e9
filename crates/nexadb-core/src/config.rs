//! Configuration for the garbage-collection pipeline.
//!
//! Supports YAML configuration files, environment variable overrides
//! (prefix `NEXADB_GC`), reasonable defaults, and validation.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Garbage-collection pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GcConfig {
    /// Seconds between garbage-collection cycles (default: 60)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Number of concurrent workers per cycle (default: 4)
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Optional per-task deadline in seconds. A task that exceeds it
    /// reports a task-level error instead of stalling its job (default: off)
    #[serde(default)]
    pub task_timeout_secs: Option<u64>,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_parallelism() -> usize {
    4
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            parallelism: default_parallelism(),
            task_timeout_secs: None,
        }
    }
}

impl GcConfig {
    /// Loads configuration from defaults, an optional YAML file, and
    /// environment variables, in increasing priority order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be parsed or values fail
    /// to deserialize.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("NEXADB_GC")
                .separator("__")
                .try_parsing(true),
        );
        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads configuration from a specific YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load(Some(path.as_ref()))
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any value is below its minimum threshold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs < 1 {
            return Err(ConfigError::Message(
                "interval_secs must be >= 1".to_string(),
            ));
        }
        if self.parallelism < 1 {
            return Err(ConfigError::Message(
                "parallelism must be >= 1".to_string(),
            ));
        }
        if let Some(timeout) = self.task_timeout_secs {
            if timeout < 1 {
                return Err(ConfigError::Message(
                    "task_timeout_secs must be >= 1 when set".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Get cycle interval as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Get per-task deadline as Duration, if configured
    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_secs.map(Duration::from_secs)
    }
}

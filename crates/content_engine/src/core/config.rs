//! # Content Configuration
//!
//! Settings for the content pipeline: where content lives on disk, whether
//! hot reload is active, and how often the file system is polled.
//!
//! Polling is deliberately coarse. Every sweep stats every cached source (and
//! every non-cached dependency), so the interval is never allowed to drop
//! below one second.

use serde::{Serialize, Deserialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, ConfigError};

/// Lowest accepted polling interval in milliseconds
pub const MIN_POLL_INTERVAL_MS: u64 = 1000;

/// # Content Configuration
///
/// Configuration for content loading and hot reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Directory every content path is resolved against
    pub root_directory: PathBuf,
    /// Whether `update_content` checks sources for modifications
    pub hot_reload: bool,
    /// Minimum time between two modification sweeps, in milliseconds
    pub poll_interval_ms: u64,
}

impl ContentConfig {
    /// Create a new content configuration with defaults
    pub fn new() -> Self {
        Self {
            root_directory: PathBuf::from("resources"),
            hot_reload: true,
            poll_interval_ms: MIN_POLL_INTERVAL_MS,
        }
    }

    /// Set the content root directory
    pub fn with_root_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.root_directory = dir.into();
        self
    }

    /// Enable or disable hot reload
    pub fn with_hot_reload(mut self, enabled: bool) -> Self {
        self.hot_reload = enabled;
        self
    }

    /// Set the polling interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Polling interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_directory.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("Content root directory cannot be empty".to_string()));
        }

        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::Invalid(format!(
                "Poll interval of {}ms is below the {}ms minimum",
                self.poll_interval_ms, MIN_POLL_INTERVAL_MS
            )));
        }

        Ok(())
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for ContentConfig {}

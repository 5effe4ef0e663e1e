//! Configuration management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Largest delivery channel the engine will allocate.
const MAX_CHANNEL_CAPACITY: usize = 65_536;

/// Longest line the bridge will buffer before giving up on the stream.
const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Settings the tail engine runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailConfig {
    /// How long the log stream may take to open before the watchdog gives up.
    pub open_grace: Duration,
    /// Capacity of the bounded line channel handed to consumers.
    pub channel_capacity: usize,
    /// Longest line, terminator included, read before the stream is failed.
    pub max_line_bytes: usize,
}

impl TailConfig {
    /// Default watchdog grace period.
    pub const DEFAULT_OPEN_GRACE: Duration = Duration::from_secs(2);
    /// Default line channel capacity.
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;
    /// Default line length limit.
    pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.open_grace.is_zero() {
            return Err(Error::Config("open grace period must be positive".into()));
        }
        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(Error::Config(format!(
                "channel capacity must be between 1 and {MAX_CHANNEL_CAPACITY}, got {}",
                self.channel_capacity
            )));
        }
        if self.max_line_bytes == 0 || self.max_line_bytes > MAX_LINE_BYTES {
            return Err(Error::Config(format!(
                "max line bytes must be between 1 and {MAX_LINE_BYTES}, got {}",
                self.max_line_bytes
            )));
        }
        Ok(())
    }
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            open_grace: Self::DEFAULT_OPEN_GRACE,
            channel_capacity: Self::DEFAULT_CHANNEL_CAPACITY,
            max_line_bytes: Self::DEFAULT_MAX_LINE_BYTES,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Watchdog grace period in milliseconds.
    pub open_grace_ms: u64,
    /// Line channel capacity.
    pub channel_capacity: usize,
    /// Longest accepted log line in bytes.
    pub max_line_bytes: usize,
    /// Trailing lines fetched when a request sets no limit.
    pub default_tail_lines: Option<u64>,
    /// Docker socket path.
    pub docker_socket: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let tail = TailConfig::default();
        Self {
            open_grace_ms: u64::try_from(tail.open_grace.as_millis()).unwrap_or(u64::MAX),
            channel_capacity: tail.channel_capacity,
            max_line_bytes: tail.max_line_bytes,
            default_tail_lines: Some(100),
            docker_socket: None,
        }
    }
}

impl Config {
    /// Load configuration from disk or create default.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Engine settings derived from this configuration.
    pub const fn tail_config(&self) -> TailConfig {
        TailConfig {
            open_grace: Duration::from_millis(self.open_grace_ms),
            channel_capacity: self.channel_capacity,
            max_line_bytes: self.max_line_bytes,
        }
    }

    /// Check the derived engine settings.
    pub fn validate(&self) -> Result<()> {
        self.tail_config().validate()
    }

    /// Get configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "logtail")
            .map(|dirs| dirs.config_dir().join("config.json"))
            .ok_or_else(|| Error::Config("could not determine config directory".into()))
    }
}

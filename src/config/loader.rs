//! Configuration loader
//!
//! Reads TOML files and fills missing keys with defaults.

use super::defaults::{default_config, DEFAULT_CONFIG_FILE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_recorder")]
    pub recorder: RecorderConfig,

    #[serde(default = "default_memory")]
    pub memory: MemoryConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,
}

/// Capture configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Period used when a caller passes 0
    #[serde(default = "default_period_ms")]
    pub default_period_ms: u64,
    /// Frames kept per recording, 0 for no limit
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,
}

impl RecorderConfig {
    /// `default_period_ms` as a duration
    pub fn default_period(&self) -> Duration {
        Duration::from_millis(self.default_period_ms)
    }

    /// `max_frames` with 0 mapped to no limit
    pub fn frame_limit(&self) -> Option<usize> {
        (self.max_frames > 0).then_some(self.max_frames)
    }
}

/// Memory access limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_max_read_size")]
    pub max_read_size: usize,
    #[serde(default = "default_module_capacity")]
    pub module_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            recorder: default_recorder(),
            memory: default_memory(),
            logging: default_logging(),
        }
    }
}

/// Configuration loader
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ConfigLoader {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Path this loader reads and writes
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Loads configuration from file
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::FileNotFound(
                self.config_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Loads configuration, falling back to defaults when the file is
    /// missing or unreadable
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(ConfigError::FileNotFound(_)) => Config::default(),
            Err(e) => {
                warn!(path = %self.config_path.display(), error = %e, "using default configuration");
                Config::default()
            }
        }
    }

    /// Saves configuration to file
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Loads configuration from [`DEFAULT_CONFIG_FILE`] in the working directory
pub fn load_config() -> Result<Config, ConfigError> {
    let loader = ConfigLoader::new(DEFAULT_CONFIG_FILE);
    Ok(loader.load_or_default())
}

// Default functions for serde
fn default_recorder() -> RecorderConfig {
    let defaults = default_config();
    RecorderConfig {
        default_period_ms: defaults.recorder.default_period_ms,
        max_frames: defaults.recorder.max_frames,
    }
}

fn default_memory() -> MemoryConfig {
    let defaults = default_config();
    MemoryConfig {
        max_read_size: defaults.memory.max_read_size,
        module_capacity: defaults.memory.module_capacity,
    }
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: default_config().logging.level,
    }
}

fn default_period_ms() -> u64 {
    default_config().recorder.default_period_ms
}

fn default_max_frames() -> usize {
    default_config().recorder.max_frames
}

fn default_max_read_size() -> usize {
    default_config().memory.max_read_size
}

fn default_module_capacity() -> usize {
    default_config().memory.module_capacity
}

fn default_log_level() -> String {
    default_config().logging.level
}

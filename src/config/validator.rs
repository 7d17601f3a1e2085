//! Configuration validator
//!
//! Validates configuration values to ensure they are within acceptable ranges.

use super::loader::{Config, ConfigError, LoggingConfig, MemoryConfig, RecorderConfig};
use tracing::warn;

const VALID_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_recorder(&config.recorder)?;
        Self::validate_memory(&config.memory)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    fn validate_recorder(recorder: &RecorderConfig) -> Result<(), ConfigError> {
        if recorder.default_period_ms == 0 {
            return Err(ConfigError::Invalid(
                "Default capture period must be at least 1 ms".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_memory(memory: &MemoryConfig) -> Result<(), ConfigError> {
        if memory.max_read_size == 0 {
            return Err(ConfigError::Invalid(
                "Maximum read size must be greater than 0".to_string(),
            ));
        }

        if memory.max_read_size > 104857600 {
            warn!(max_read_size = memory.max_read_size, "maximum read size exceeds 100MB");
        }

        if memory.module_capacity == 0 {
            return Err(ConfigError::Invalid(
                "Module capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        if !VALID_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, VALID_LEVELS
            )));
        }
        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_period_rejected() {
        let mut config = Config::default();
        config.recorder.default_period_ms = 0;
        assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_memory_limits() {
        let mut config = Config::default();
        config.memory.max_read_size = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.memory.module_capacity = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.memory.max_read_size = 200 * 1024 * 1024;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_log_levels() {
        let mut config = Config::default();
        for level in ["TRACE", "debug", "Warn", "off"] {
            config.logging.level = level.to_string();
            assert!(validate_config(&config).is_ok(), "{}", level);
        }

        config.logging.level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }
}

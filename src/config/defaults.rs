//! Default configuration values

use serde::{Deserialize, Serialize};

/// File looked up by [`load_config`](super::load_config)
pub const DEFAULT_CONFIG_FILE: &str = "memory-recorder.toml";

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub recorder: RecorderDefaults,
    pub memory: MemoryDefaults,
    pub logging: LoggingDefaults,
}

/// Default capture settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderDefaults {
    pub default_period_ms: u64,
    pub max_frames: usize,
}

/// Default memory access limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDefaults {
    pub max_read_size: usize,
    pub module_capacity: usize,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        recorder: RecorderDefaults {
            default_period_ms: 50,
            max_frames: 0, // unbounded
        },
        memory: MemoryDefaults {
            max_read_size: 10485760, // 10MB
            module_capacity: 1024,
        },
        logging: LoggingDefaults {
            level: "info".to_string(),
        },
    }
}

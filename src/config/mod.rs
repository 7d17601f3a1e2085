//! Configuration for the recorder
//!
//! TOML file with `[recorder]`, `[memory]` and `[logging]` sections; every
//! key is optional and falls back to [`default_config`].

mod defaults;
mod loader;
mod validator;

pub use defaults::{default_config, ConfigDefaults, DEFAULT_CONFIG_FILE};
pub use loader::{load_config, ConfigLoader};
pub use validator::{validate_config, ConfigValidator};

pub use loader::{Config, LoggingConfig, MemoryConfig, RecorderConfig};

pub use loader::ConfigError;

pub type ConfigResult<T> = Result<T, ConfigError>;

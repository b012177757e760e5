//! Device configuration.
//!
//! Mirrors the pipe module parameters: how many pipe devices to create and
//! how large each buffer is. Loaded from YAML files and environment
//! variables.

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "scullpipe.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "SCULLPIPE_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "SCULLPIPE";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "SCULLPIPE_LOG";

/// Default number of pipe devices.
pub const DEFAULT_DEVICES: usize = 4;
/// Default buffer size in bytes; one byte is kept free.
pub const DEFAULT_BUFFER_SIZE: usize = 4000;

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Pipe device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipeConfig {
    /// Number of pipe devices.
    pub devices: usize,
    /// Buffer size per device in bytes. Holds at most `buffer_size - 1` bytes.
    pub buffer_size: usize,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            devices: DEFAULT_DEVICES,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl PipeConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `scullpipe.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix, e.g.
    ///    `SCULLPIPE__BUFFER_SIZE=64`
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: PipeConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no device can be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.devices == 0 {
            return Err(ConfigError::Invalid(
                "devices must be at least 1".to_string(),
            ));
        }
        if self.buffer_size < 2 {
            return Err(ConfigError::Invalid(format!(
                "buffer_size must be at least 2, got {}",
                self.buffer_size
            )));
        }
        Ok(())
    }

    /// Small configuration for tests.
    pub fn for_test() -> Self {
        Self {
            devices: 2,
            buffer_size: 16,
        }
    }
}

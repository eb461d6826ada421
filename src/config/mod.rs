//! Layered configuration for the relay host.
//!
//! Sources, lowest precedence first:
//! 1. `outbox-relay.yaml` in the working directory, if present
//! 2. the file named by `OUTBOX_RELAY_CONFIG`, if set
//! 3. the path passed to [`AppConfig::load`], if any
//! 4. environment variables such as `OUTBOX_RELAY__OUTBOX__BATCH_SIZE=50`

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::outbox::DEFAULT_BATCH_SIZE;

pub const DEFAULT_CONFIG_FILE: &str = "outbox-relay";
/// Environment variable naming an extra config file.
pub const CONFIG_ENV_VAR: &str = "OUTBOX_RELAY_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "OUTBOX_RELAY";

#[derive(Debug, Error)]
#[error("configuration error: {0}")]
pub struct ConfigError(#[from] ::config::ConfigError);

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub outbox: OutboxConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/outbox_relay".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    /// Rows per processor batch.
    pub batch_size: usize,
    pub poll_interval_secs: u64,
    /// When false the host runs without a scheduler.
    pub enabled: bool,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            poll_interval_secs: 30,
            enabled: true,
        }
    }
}

impl OutboxConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl AppConfig {
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config, Environment, File, FileFormat};

        let mut builder = Config::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&env_path, FileFormat::Yaml).required(true));
        }

        if let Some(path) = path {
            builder = builder.add_source(File::new(path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Parse a YAML document on top of the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        use ::config::{Config, File, FileFormat};

        let config = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

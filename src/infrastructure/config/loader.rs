//! Layered configuration loading and validation.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::Config;

/// Primary config file, relative to the working directory.
pub const CONFIG_FILE: &str = "cardfleet.yaml";
/// Optional local overrides, relative to the working directory.
pub const LOCAL_CONFIG_FILE: &str = "cardfleet.local.yaml";
/// Prefix for environment overrides; nested keys use `__`.
pub const ENV_PREFIX: &str = "CARDFLEET_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Database url cannot be empty")]
    EmptyDatabaseUrl,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid connect_retries: {0}. Must be at least 1")]
    InvalidConnectRetries(u32),

    #[error("Telegram api_base_url cannot be empty")]
    EmptyApiBaseUrl,

    #[error("Invalid {0}: must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `cardfleet.yaml`, or `path` when given
    /// 3. `cardfleet.local.yaml` (optional overrides)
    /// 4. Environment variables (`CARDFLEET_*`, highest priority)
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let primary = path.unwrap_or_else(|| Path::new(CONFIG_FILE));

        let config: Config = Self::figment(primary)
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, without local or env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(primary: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(primary))
            .merge(Yaml::file(LOCAL_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.url.trim().is_empty() {
            return Err(ConfigError::EmptyDatabaseUrl);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }
        if config.database.connect_retries == 0 {
            return Err(ConfigError::InvalidConnectRetries(config.database.connect_retries));
        }

        if config.telegram.api_base_url.trim().is_empty() {
            return Err(ConfigError::EmptyApiBaseUrl);
        }
        if config.telegram.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroInterval("telegram.request_timeout_secs"));
        }

        if config.fleet.sync_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("fleet.sync_interval_secs"));
        }
        if config.fleet.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("fleet.poll_interval_ms"));
        }
        if config.fleet.extra_transient_patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::ValidationFailed(
                "fleet.extra_transient_patterns cannot contain empty patterns".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}

//! Configuration tree with serde defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for cardfleet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Telegram Bot API configuration
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Fleet timing and failure classification
    #[serde(default)]
    pub fleet: FleetConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// `SQLite` connection URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection attempts at startup before giving up
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
}

fn default_database_url() -> String {
    "sqlite:data/cardfleet.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_connect_retries() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_retries: default_connect_retries(),
        }
    }
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TelegramConfig {
    /// Base URL of the Bot API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Long-poll timeout passed to getUpdates; 0 means short polling
    #[serde(default)]
    pub poll_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_timeout_secs: 0,
        }
    }
}

impl TelegramConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Fleet timing and failure classification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FleetConfig {
    /// Seconds between reconciliation cycles
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Milliseconds between update polls of a single bot
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Pause after stopping a replaced bot before its successor starts
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Additional error substrings treated as transient connectivity failures
    #[serde(default)]
    pub extra_transient_patterns: Vec<String>,
}

const fn default_sync_interval_secs() -> u64 {
    10
}

const fn default_poll_interval_ms() -> u64 {
    1000
}

const fn default_settle_delay_ms() -> u64 {
    1000
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: default_sync_interval_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            extra_transient_patterns: Vec::new(),
        }
    }
}

impl FleetConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation policy for file logs: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

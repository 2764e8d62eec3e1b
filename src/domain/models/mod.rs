//! Domain models.

pub mod card;
pub mod config;
pub mod update;

pub use card::{BotBinding, BotToken, CardId, CardProfile, INVALID_TOKEN_SENTINEL};
pub use config::{Config, DatabaseConfig, FleetConfig, LoggingConfig, TelegramConfig};
pub use update::{BotIdentity, IncomingMessage, Update};

//! Telegram Bot API adapter.

pub mod client;
pub mod types;

pub use client::TelegramGateway;

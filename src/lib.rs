//! Cardfleet - Telegram bot fleet for visit cards
//!
//! Every visit card with a Telegram bot token gets one polling bot that
//! answers `/start` with the card's title, description and logo. A
//! reconciliation loop keeps the running fleet in line with the cards table:
//! new tokens are started, rejected tokens are flagged on the card and
//! stopped, and removed or changed tokens are swept.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and the two ports
//!   (`CardStore`, `BotGateway`)
//! - **Service Layer** (`services`): bot workers, the fleet registry, the
//!   reconciler and failure classification
//! - **Adapters** (`adapters`): SQLite card store and Telegram Bot API client
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use cardfleet::cli::FleetRuntime;
//! use cardfleet::infrastructure::config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load(None)?;
//!     let runtime = FleetRuntime::build(&config).await?;
//!     let report = runtime.reconciler.reconcile_once().await?;
//!     println!("{} bots running", report.running);
//!     runtime.fleet.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{BotBinding, BotToken, CardId, CardProfile, Config};
pub use domain::ports::{BotGateway, CardStore};
pub use domain::{DomainError, FleetError, GatewayError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CycleReport, FleetRegistry, Reconciler, StartOutcome};

//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - CardStore: desired state and counters for visit cards
//! - BotGateway: the Telegram Bot API operations the fleet needs
//!
//! The fleet engine in `services` is written only against these traits.

pub mod bot_gateway;
pub mod card_store;

pub use bot_gateway::BotGateway;
pub use card_store::CardStore;

//! Card store port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{BotBinding, CardId, CardProfile};

/// Repository interface for the visit cards a bot fleet is built from.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// List cards that should currently have a running bot.
    ///
    /// Excludes deleted cards, cards without a token or with the invalid-token
    /// sentinel, and cards whose token is already marked invalid.
    async fn list_active(&self) -> DomainResult<Vec<BotBinding>>;

    /// Record the outcome of a token validation.
    ///
    /// `message` is stored as the diagnostic; pass an empty string to clear it.
    async fn set_token_validity(
        &self,
        card_id: CardId,
        valid: bool,
        message: &str,
    ) -> DomainResult<()>;

    /// Increment the bot interaction counter by exactly one.
    ///
    /// Returns the new counter value.
    async fn increment_bot_views(&self, card_id: CardId) -> DomainResult<u64>;

    /// Get the public content of a card.
    async fn get_profile(&self, card_id: CardId) -> DomainResult<Option<CardProfile>>;
}

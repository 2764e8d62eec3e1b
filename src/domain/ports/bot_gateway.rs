//! Messaging gateway port - the Telegram Bot API as the fleet sees it.

use async_trait::async_trait;

use crate::domain::errors::GatewayError;
use crate::domain::models::{BotIdentity, BotToken, Update};

/// Trait for bot messaging backends.
///
/// Every call is scoped to one bot token. Implementations must never put the
/// raw token into a returned error.
#[async_trait]
pub trait BotGateway: Send + Sync {
    /// Check the token and return the bot account it belongs to.
    async fn authenticate(&self, token: &BotToken) -> Result<BotIdentity, GatewayError>;

    /// Remove any push (webhook) registration so updates can be pulled.
    async fn clear_webhook(&self, token: &BotToken) -> Result<(), GatewayError>;

    /// Fetch pending updates with `update_id >= offset`, oldest first.
    async fn poll_updates(&self, token: &BotToken, offset: i64) -> Result<Vec<Update>, GatewayError>;

    /// Send a text message to a chat.
    async fn send_text(&self, token: &BotToken, chat_id: i64, text: &str) -> Result<(), GatewayError>;

    /// Send a photo by URL with a caption.
    async fn send_photo(
        &self,
        token: &BotToken,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), GatewayError>;
}

//! Domain errors for the cardfleet bot manager.

use thiserror::Error;

use super::models::{BotToken, CardId};

fn format_code(code: &Option<i64>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

/// Errors raised by the card store and other domain-level operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Visit card not found: {0}")]
    CardNotFound(CardId),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

/// Errors returned by a messaging gateway call.
///
/// Display strings are what the failure classifier inspects, so the
/// transport-level variants keep their `transport error` / `timeout`
/// prefixes. None of them may contain a bot token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request or connection timed out.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// The API answered with `ok: false`.
    #[error("{description} (code {})", format_code(.code))]
    Api {
        code: Option<i64>,
        description: String,
    },

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Build an API rejection error.
    pub fn api(code: Option<i64>, description: impl Into<String>) -> Self {
        Self::Api {
            code,
            description: description.into(),
        }
    }
}

/// Errors returned by fleet registry operations.
#[derive(Debug, Error)]
pub enum FleetError {
    /// The token is already bound to a different card.
    #[error("bot token {token} is already in use by visit card {existing_card}")]
    Conflict {
        token: BotToken,
        existing_card: CardId,
    },

    /// The bot could not be authenticated or set up.
    #[error("failed to start bot for visit card {card_id}: {source}")]
    Creation {
        card_id: CardId,
        #[source]
        source: GatewayError,
    },

    /// The fleet is shutting down and accepts no new workers.
    #[error("fleet is shutting down, not starting bot for visit card {card_id}")]
    ShuttingDown { card_id: CardId },
}

impl FleetError {
    /// Whether the start was refused because another card owns the token.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

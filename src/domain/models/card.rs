//! Visit card domain model.
//!
//! A visit card is the business record a Telegram bot is attached to. The
//! fleet engine only sees the handful of fields it needs to decide whether a
//! bot should be running.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token value the web API writes when a submitted token was rejected.
pub const INVALID_TOKEN_SENTINEL: &str = "token was not valid";

/// Number of token characters kept when a token is rendered for logs.
const VISIBLE_TOKEN_CHARS: usize = 10;

/// Visit card identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub i64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Telegram bot token.
///
/// `Debug` and `Display` only show the first few characters so the token can
/// be put in log fields directly. Use [`BotToken::expose`] when the raw value
/// is needed for an API call.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotToken(String);

impl BotToken {
    /// Wrap a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// False for empty tokens and for the "known bad" sentinel.
    pub fn is_usable(&self) -> bool {
        let trimmed = self.0.trim();
        !trimmed.is_empty() && trimmed != INVALID_TOKEN_SENTINEL
    }

    /// Shortened form safe for logs: first ten characters followed by `...`.
    pub fn masked(&self) -> String {
        let prefix: String = self.0.chars().take(VISIBLE_TOKEN_CHARS).collect();
        format!("{prefix}...")
    }
}

impl fmt::Display for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BotToken").field(&self.masked()).finish()
    }
}

impl From<&str> for BotToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Desired-state row for one visit card: which token should be running for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotBinding {
    pub card_id: CardId,
    pub token: BotToken,
    pub token_valid: bool,
    /// Last validation failure, empty when the token is healthy.
    pub token_error_message: String,
}

impl BotBinding {
    /// A valid binding with no stored diagnostic.
    pub fn new(card_id: CardId, token: impl Into<BotToken>) -> Self {
        Self {
            card_id,
            token: token.into(),
            token_valid: true,
            token_error_message: String::new(),
        }
    }

    /// Whether the store still carries a validity problem for this card.
    pub fn has_validity_flag(&self) -> bool {
        !self.token_valid || !self.token_error_message.is_empty()
    }
}

/// Public content of a visit card, sent by the bot as its welcome message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardProfile {
    pub card_id: CardId,
    pub title: String,
    pub description: String,
    pub logo_url: Option<String>,
}

impl CardProfile {
    /// Title and description separated by a blank line.
    pub fn welcome_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.description)
    }

    /// Logo URL, if one is set and non-blank.
    pub fn logo(&self) -> Option<&str> {
        self.logo_url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

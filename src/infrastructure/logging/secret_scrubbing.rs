//! Redaction of bot tokens and other secrets in log and error text.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Scrubs bot tokens and other credentials from free-form text.
///
/// Used on gateway error messages before they are logged or written to the
/// card store as a diagnostic.
#[derive(Clone)]
pub struct SecretScrubber {
    bot_url_pattern: Regex,
    bot_token_pattern: Regex,
    bearer_pattern: Regex,
    password_pattern: Regex,
}

impl SecretScrubber {
    /// Create a new scrubber
    pub fn new() -> Self {
        Self {
            // Match Bot API paths: /bot123456:ABC.../getMe
            bot_url_pattern: Regex::new(r"/bot[0-9]+:[A-Za-z0-9_-]+").unwrap(),
            // Match bare Telegram bot tokens: 123456789:AA...
            bot_token_pattern: Regex::new(r"\b[0-9]{5,}:[A-Za-z0-9_-]{30,}").unwrap(),
            // Match Bearer tokens in Authorization headers
            bearer_pattern: Regex::new(r"Bearer\s+[a-zA-Z0-9-_\.]+").unwrap(),
            // Match password fields
            password_pattern: Regex::new(r#"["']?password["']?\s*[:=]\s*["']?([^"'\s,}]+)["']?"#).unwrap(),
        }
    }

    /// Shared instance; the patterns are compiled once.
    pub fn global() -> &'static Self {
        static SCRUBBER: OnceLock<SecretScrubber> = OnceLock::new();
        SCRUBBER.get_or_init(Self::new)
    }

    /// Scrub a message of sensitive data
    pub fn scrub_message(&self, message: &str) -> String {
        let mut scrubbed = self.bot_url_pattern
            .replace_all(message, "/bot[TOKEN_REDACTED]")
            .to_string();
        scrubbed = self.bot_token_pattern
            .replace_all(&scrubbed, "[TOKEN_REDACTED]")
            .to_string();
        scrubbed = self.bearer_pattern
            .replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]")
            .to_string();
        scrubbed = self.password_pattern
            .replace_all(&scrubbed, "password=[REDACTED]")
            .to_string();
        scrubbed
    }
}

impl Default for SecretScrubber {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}

/// Scrub `message` with the shared scrubber.
pub fn scrub(message: &str) -> String {
    SecretScrubber::global().scrub_message(message)
}

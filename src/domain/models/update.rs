//! Messaging gateway payloads as seen by the bot workers.

use serde::{Deserialize, Serialize};

/// Account behind a bot token, as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub username: String,
}

/// One incoming update from a bot's update queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

impl Update {
    /// A text message update.
    pub fn message(update_id: i64, chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            update_id,
            message: Some(IncomingMessage {
                chat_id,
                text: Some(text.into()),
            }),
        }
    }
}

/// A chat message delivered to a bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub text: Option<String>,
}

impl IncomingMessage {
    /// Command name without the leading slash, bot mention, or arguments.
    ///
    /// `/start@acme_bot payload` yields `start`. Plain text yields `None`.
    pub fn command(&self) -> Option<&str> {
        let text = self.text.as_deref()?;
        let rest = text.strip_prefix('/')?;
        let word = rest.split(char::is_whitespace).next()?;
        let name = word.split('@').next().unwrap_or(word);
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: Option<&str>) -> IncomingMessage {
        IncomingMessage {
            chat_id: 1,
            text: text.map(str::to_string),
        }
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(msg(Some("/start")).command(), Some("start"));
        assert_eq!(msg(Some("/help me please")).command(), Some("help"));
        assert_eq!(msg(Some("/start@acme_bot")).command(), Some("start"));
        assert_eq!(msg(Some("hello")).command(), None);
        assert_eq!(msg(Some("/")).command(), None);
        assert_eq!(msg(Some("/ start")).command(), None);
        assert_eq!(msg(None).command(), None);
    }
}

//! Bot API wire types.

use serde::{Deserialize, Serialize};

use crate::domain::errors::GatewayError;
use crate::domain::models::{BotIdentity, IncomingMessage, Update};

/// Envelope every Bot API method responds with.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the envelope into the result or an API error.
    pub fn into_result(self) -> Result<T, GatewayError> {
        if !self.ok {
            return Err(GatewayError::api(
                self.error_code,
                self.description.unwrap_or_else(|| "request was not successful".to_string()),
            ));
        }
        self.result
            .ok_or_else(|| GatewayError::Decode("missing result in successful response".to_string()))
    }
}

/// `getMe` result.
#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: String,
}

impl From<User> for BotIdentity {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username.unwrap_or(user.first_name),
        }
    }
}

/// Chat a message arrived in.
#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Incoming message; only the fields the bot uses.
#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

/// One entry of a getUpdates result. Only plain messages are mapped; other
/// update kinds arrive with `message: None` and still advance the offset.
#[derive(Debug, Deserialize)]
pub struct RawUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

impl From<RawUpdate> for Update {
    fn from(raw: RawUpdate) -> Self {
        Self {
            update_id: raw.update_id,
            message: raw.message.map(|m| IncomingMessage {
                chat_id: m.chat.id,
                text: m.text,
            }),
        }
    }
}

/// `getUpdates` body.
#[derive(Debug, Serialize)]
pub struct GetUpdatesRequest {
    pub offset: i64,
    pub timeout: u64,
    pub allowed_updates: Vec<&'static str>,
}

/// `deleteWebhook` body.
#[derive(Debug, Serialize)]
pub struct DeleteWebhookRequest {
    pub drop_pending_updates: bool,
}

/// `sendMessage` body.
#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
}

/// `sendPhoto` body.
#[derive(Debug, Serialize)]
pub struct SendPhotoRequest<'a> {
    pub chat_id: i64,
    pub photo: &'a str,
    pub caption: &'a str,
}

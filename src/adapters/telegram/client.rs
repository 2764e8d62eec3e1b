//! HTTP client for the Telegram Bot API.

use std::error::Error as StdError;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{
    ApiResponse, DeleteWebhookRequest, GetUpdatesRequest, RawUpdate, SendMessageRequest, SendPhotoRequest, User,
};
use crate::domain::errors::GatewayError;
use crate::domain::models::{BotIdentity, BotToken, TelegramConfig, Update};
use crate::domain::ports::BotGateway;
use crate::infrastructure::logging::scrub;

/// Bot API gateway shared by every bot in the fleet.
///
/// One connection pool serves all tokens; the token is only ever part of the
/// request path and is scrubbed from every error this client returns.
#[derive(Debug, Clone)]
pub struct TelegramGateway {
    http_client: ReqwestClient,
    base_url: String,
    poll_timeout_secs: u64,
    request_timeout: Duration,
}

impl TelegramGateway {
    /// Build the HTTP client from the Telegram settings.
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(config.request_timeout())
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            poll_timeout_secs: config.poll_timeout_secs,
            request_timeout: config.request_timeout(),
        })
    }

    fn method_url(&self, token: &BotToken, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, token.expose(), method)
    }

    async fn call<B, T>(&self, token: &BotToken, method: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.call_with_timeout(token, method, body, self.request_timeout).await
    }

    async fn call_with_timeout<B, T>(
        &self,
        token: &BotToken,
        method: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(self.method_url(token, method))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        match serde_json::from_slice::<ApiResponse<T>>(&bytes) {
            Ok(envelope) => envelope.into_result(),
            Err(_) if !status.is_success() => Err(GatewayError::api(
                Some(i64::from(status.as_u16())),
                status.canonical_reason().unwrap_or("unexpected status"),
            )),
            Err(e) => Err(GatewayError::Decode(scrub(&e.to_string()))),
        }
    }
}

/// Convert a reqwest failure into a token-free gateway error.
///
/// The top-level reqwest message is generic ("error sending request"); the
/// useful part ("connection refused", "dns error") lives in the source chain.
fn map_reqwest_error(error: reqwest::Error) -> GatewayError {
    let is_timeout = error.is_timeout();
    let is_decode = error.is_decode() || error.is_body();
    let error = error.without_url();

    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    let message = scrub(&message);

    if is_timeout {
        GatewayError::Timeout(message)
    } else if is_decode {
        GatewayError::Decode(message)
    } else {
        GatewayError::Transport(message)
    }
}

#[async_trait]
impl BotGateway for TelegramGateway {
    async fn authenticate(&self, token: &BotToken) -> Result<BotIdentity, GatewayError> {
        let user: User = self.call(token, "getMe", &serde_json::json!({})).await?;
        Ok(user.into())
    }

    async fn clear_webhook(&self, token: &BotToken) -> Result<(), GatewayError> {
        let _: bool = self
            .call(token, "deleteWebhook", &DeleteWebhookRequest { drop_pending_updates: false })
            .await?;
        Ok(())
    }

    async fn poll_updates(&self, token: &BotToken, offset: i64) -> Result<Vec<Update>, GatewayError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout_secs,
            allowed_updates: vec!["message"],
        };
        // A long poll holds the request open for poll_timeout_secs on top of
        // the usual round trip.
        let timeout = self.request_timeout + Duration::from_secs(self.poll_timeout_secs);
        let raw: Vec<RawUpdate> = self.call_with_timeout(token, "getUpdates", &request, timeout).await?;
        Ok(raw.into_iter().map(Update::from).collect())
    }

    async fn send_text(&self, token: &BotToken, chat_id: i64, text: &str) -> Result<(), GatewayError> {
        let _: serde_json::Value = self
            .call(token, "sendMessage", &SendMessageRequest { chat_id, text })
            .await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        token: &BotToken,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), GatewayError> {
        let request = SendPhotoRequest {
            chat_id,
            photo: photo_url,
            caption,
        };
        let _: serde_json::Value = self.call(token, "sendPhoto", &request).await?;
        Ok(())
    }
}

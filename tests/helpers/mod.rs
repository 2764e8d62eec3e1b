//! Shared fakes for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cardfleet::domain::errors::{DomainError, DomainResult, GatewayError};
use cardfleet::domain::models::{
    BotBinding, BotIdentity, BotToken, CardId, CardProfile, Config, Update, INVALID_TOKEN_SENTINEL,
};
use cardfleet::domain::ports::{BotGateway, CardStore};

/// One visit card as the in-memory store keeps it.
#[derive(Debug, Clone)]
pub struct Card {
    pub id: CardId,
    pub title: String,
    pub description: String,
    pub logo_url: Option<String>,
    pub token: String,
    pub token_valid: bool,
    pub token_error_message: String,
    pub bot_view_count: u64,
    pub deleted: bool,
}

/// In-memory `CardStore`.
#[derive(Default)]
pub struct MemoryStore {
    cards: Mutex<BTreeMap<i64, Card>>,
    pub fail_listing: AtomicBool,
    pub validity_updates: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_card(&self, id: i64, token: &str) {
        self.cards.lock().unwrap().insert(
            id,
            Card {
                id: CardId(id),
                title: format!("Company {id}"),
                description: format!("About company {id}"),
                logo_url: None,
                token: token.to_string(),
                token_valid: true,
                token_error_message: String::new(),
                bot_view_count: 0,
                deleted: false,
            },
        );
    }

    pub fn set_token(&self, id: i64, token: &str) {
        let mut cards = self.cards.lock().unwrap();
        let card = cards.get_mut(&id).unwrap();
        card.token = token.to_string();
        card.token_valid = true;
        card.token_error_message.clear();
    }

    pub fn set_logo(&self, id: i64, url: &str) {
        self.cards.lock().unwrap().get_mut(&id).unwrap().logo_url = Some(url.to_string());
    }

    pub fn delete(&self, id: i64) {
        self.cards.lock().unwrap().get_mut(&id).unwrap().deleted = true;
    }

    pub fn card(&self, id: i64) -> Card {
        self.cards.lock().unwrap().get(&id).cloned().unwrap()
    }
}

#[async_trait]
impl CardStore for MemoryStore {
    async fn list_active(&self) -> DomainResult<Vec<BotBinding>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("database is locked".to_string()));
        }
        Ok(self
            .cards
            .lock()
            .unwrap()
            .values()
            .filter(|c| {
                !c.deleted && !c.token.trim().is_empty() && c.token != INVALID_TOKEN_SENTINEL && c.token_valid
            })
            .map(|c| BotBinding {
                card_id: c.id,
                token: BotToken::new(c.token.clone()),
                token_valid: c.token_valid,
                token_error_message: c.token_error_message.clone(),
            })
            .collect())
    }

    async fn set_token_validity(&self, card_id: CardId, valid: bool, message: &str) -> DomainResult<()> {
        self.validity_updates.fetch_add(1, Ordering::SeqCst);
        let mut cards = self.cards.lock().unwrap();
        let card = cards.get_mut(&card_id.0).ok_or(DomainError::CardNotFound(card_id))?;
        card.token_valid = valid;
        card.token_error_message = message.to_string();
        Ok(())
    }

    async fn increment_bot_views(&self, card_id: CardId) -> DomainResult<u64> {
        let mut cards = self.cards.lock().unwrap();
        let card = cards.get_mut(&card_id.0).ok_or(DomainError::CardNotFound(card_id))?;
        card.bot_view_count += 1;
        Ok(card.bot_view_count)
    }

    async fn get_profile(&self, card_id: CardId) -> DomainResult<Option<CardProfile>> {
        Ok(self
            .cards
            .lock()
            .unwrap()
            .get(&card_id.0)
            .filter(|c| !c.deleted)
            .map(|c| CardProfile {
                card_id: c.id,
                title: c.title.clone(),
                description: c.description.clone(),
                logo_url: c.logo_url.clone(),
            }))
    }
}

/// A message the fake gateway was asked to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text { token: String, chat_id: i64, text: String },
    Photo { token: String, chat_id: i64, url: String, caption: String },
}

impl Sent {
    pub fn token(&self) -> &str {
        match self {
            Self::Text { token, .. } | Self::Photo { token, .. } => token,
        }
    }
}

/// Scriptable `BotGateway`.
///
/// Tokens authenticate unless an error is registered for them. Each token has
/// a queue of poll results; an empty queue polls as "no updates".
#[derive(Default)]
pub struct FakeGateway {
    auth_errors: Mutex<HashMap<String, GatewayError>>,
    polls: Mutex<HashMap<String, VecDeque<Result<Vec<Update>, GatewayError>>>>,
    offsets: Mutex<Vec<(String, i64)>>,
    sent: Mutex<Vec<Sent>>,
    pub auth_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_auth(&self, token: &str, error: GatewayError) {
        self.auth_errors.lock().unwrap().insert(token.to_string(), error);
    }

    pub fn heal_auth(&self, token: &str) {
        self.auth_errors.lock().unwrap().remove(token);
    }

    pub fn push_poll(&self, token: &str, result: Result<Vec<Update>, GatewayError>) {
        self.polls
            .lock()
            .unwrap()
            .entry(token.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Offsets passed to `poll_updates` for `token`, in call order.
    pub fn offsets(&self, token: &str) -> Vec<i64> {
        self.offsets
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == token)
            .map(|(_, offset)| *offset)
            .collect()
    }

    pub fn pending_polls(&self, token: &str) -> usize {
        self.polls.lock().unwrap().get(token).map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl BotGateway for FakeGateway {
    async fn authenticate(&self, token: &BotToken) -> Result<BotIdentity, GatewayError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.auth_errors.lock().unwrap().get(token.expose()) {
            return Err(error.clone());
        }
        Ok(BotIdentity {
            id: 1,
            username: format!("bot_{}", token.expose().to_lowercase()),
        })
    }

    async fn clear_webhook(&self, _token: &BotToken) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn poll_updates(&self, token: &BotToken, offset: i64) -> Result<Vec<Update>, GatewayError> {
        self.offsets.lock().unwrap().push((token.expose().to_string(), offset));
        self.polls
            .lock()
            .unwrap()
            .get_mut(token.expose())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn send_text(&self, token: &BotToken, chat_id: i64, text: &str) -> Result<(), GatewayError> {
        self.sent.lock().unwrap().push(Sent::Text {
            token: token.expose().to_string(),
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_photo(
        &self,
        token: &BotToken,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), GatewayError> {
        self.sent.lock().unwrap().push(Sent::Photo {
            token: token.expose().to_string(),
            chat_id,
            url: photo_url.to_string(),
            caption: caption.to_string(),
        });
        Ok(())
    }
}

/// Config with fast timings for tests.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.fleet.poll_interval_ms = 5;
    config.fleet.settle_delay_ms = 1;
    config.fleet.sync_interval_secs = 1;
    config
}

pub fn unauthorized() -> GatewayError {
    GatewayError::api(Some(401), "Unauthorized")
}

pub fn connection_refused() -> GatewayError {
    GatewayError::Transport("error sending request: tcp connect error: Connection refused (os error 111)".to_string())
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn eventually<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

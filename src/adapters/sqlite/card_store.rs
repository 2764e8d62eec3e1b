//! SQLite implementation of the CardStore.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BotBinding, BotToken, CardId, CardProfile, INVALID_TOKEN_SENTINEL};
use crate::domain::ports::CardStore;

/// Fields needed to insert a visit card.
#[derive(Debug, Clone, Default)]
pub struct NewVisitCard {
    pub title: String,
    pub description: String,
    pub logo_url: String,
    pub telegram_bot_token: String,
}

/// `CardStore` backed by the `visit_cards` table.
#[derive(Clone)]
pub struct SqliteCardStore {
    pool: SqlitePool,
}

impl SqliteCardStore {
    /// Create a store over an already migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a card. The web API owns card creation; this exists for
    /// seeding and tests.
    pub async fn insert_card(&self, card: &NewVisitCard) -> DomainResult<CardId> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"INSERT INTO visit_cards (title, description, logo_url, telegram_bot_token, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#
        )
        .bind(&card.title)
        .bind(&card.description)
        .bind(&card.logo_url)
        .bind(&card.telegram_bot_token)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(CardId(result.last_insert_rowid()))
    }

    /// Replace a card's bot token and reset its validity.
    pub async fn update_token(&self, card_id: CardId, token: &str) -> DomainResult<()> {
        let result = sqlx::query(
            r#"UPDATE visit_cards SET telegram_bot_token = ?, token_valid = 1, token_error_message = '',
               updated_at = ? WHERE id = ? AND deleted_at IS NULL"#
        )
        .bind(token)
        .bind(Utc::now().to_rfc3339())
        .bind(card_id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::CardNotFound(card_id));
        }
        Ok(())
    }

    /// Soft-delete a card.
    pub async fn soft_delete(&self, card_id: CardId) -> DomainResult<()> {
        let result = sqlx::query("UPDATE visit_cards SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(Utc::now().to_rfc3339())
            .bind(card_id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::CardNotFound(card_id));
        }
        Ok(())
    }

    /// Current bot view counter, including for deleted cards.
    pub async fn bot_view_count(&self, card_id: CardId) -> DomainResult<u64> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT bot_view_count FROM visit_cards WHERE id = ?")
            .bind(card_id.0)
            .fetch_optional(&self.pool)
            .await?;

        let (count,) = row.ok_or(DomainError::CardNotFound(card_id))?;
        to_count(count)
    }

    /// Validity state as stored, regardless of the active filter.
    pub async fn token_status(&self, card_id: CardId) -> DomainResult<(bool, String)> {
        let row: Option<(bool, String)> =
            sqlx::query_as("SELECT token_valid, token_error_message FROM visit_cards WHERE id = ?")
                .bind(card_id.0)
                .fetch_optional(&self.pool)
                .await?;

        row.ok_or(DomainError::CardNotFound(card_id))
    }
}

fn to_count(value: i64) -> DomainResult<u64> {
    u64::try_from(value).map_err(|_| DomainError::SerializationError(format!("Negative counter: {value}")))
}

#[async_trait]
impl CardStore for SqliteCardStore {
    async fn list_active(&self) -> DomainResult<Vec<BotBinding>> {
        let rows: Vec<BindingRow> = sqlx::query_as(
            r#"SELECT id, telegram_bot_token, token_valid, token_error_message
               FROM visit_cards
               WHERE deleted_at IS NULL
                 AND TRIM(telegram_bot_token) != ''
                 AND telegram_bot_token != ?
                 AND token_valid = 1
               ORDER BY id"#
        )
        .bind(INVALID_TOKEN_SENTINEL)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BotBinding::from).collect())
    }

    async fn set_token_validity(&self, card_id: CardId, valid: bool, message: &str) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE visit_cards SET token_valid = ?, token_error_message = ?, updated_at = ? WHERE id = ?"
        )
        .bind(valid)
        .bind(message)
        .bind(Utc::now().to_rfc3339())
        .bind(card_id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::CardNotFound(card_id));
        }
        Ok(())
    }

    async fn increment_bot_views(&self, card_id: CardId) -> DomainResult<u64> {
        let row: Option<(i64,)> = sqlx::query_as(
            "UPDATE visit_cards SET bot_view_count = bot_view_count + 1 WHERE id = ? RETURNING bot_view_count"
        )
        .bind(card_id.0)
        .fetch_optional(&self.pool)
        .await?;

        let (count,) = row.ok_or(DomainError::CardNotFound(card_id))?;
        to_count(count)
    }

    async fn get_profile(&self, card_id: CardId) -> DomainResult<Option<CardProfile>> {
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT id, title, description, logo_url FROM visit_cards WHERE id = ? AND deleted_at IS NULL"
        )
        .bind(card_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CardProfile::from))
    }
}

#[derive(sqlx::FromRow)]
struct BindingRow {
    id: i64,
    telegram_bot_token: String,
    token_valid: bool,
    token_error_message: String,
}

impl From<BindingRow> for BotBinding {
    fn from(row: BindingRow) -> Self {
        Self {
            card_id: CardId(row.id),
            token: BotToken::new(row.telegram_bot_token),
            token_valid: row.token_valid,
            token_error_message: row.token_error_message,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: i64,
    title: String,
    description: String,
    logo_url: String,
}

impl From<ProfileRow> for CardProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            card_id: CardId(row.id),
            title: row.title,
            description: row.description,
            logo_url: Some(row.logo_url).filter(|url| !url.trim().is_empty()),
        }
    }
}

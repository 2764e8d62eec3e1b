//! SQLite database connection pool management.

use backoff::ExponentialBackoffBuilder;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while opening the database.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to create pool: {0}")]
    PoolCreationFailed(#[source] sqlx::Error),
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
    #[error("Failed to create directory: {0}")]
    DirectoryCreationFailed(#[source] std::io::Error),
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),
}

/// Pool sizing.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(3),
        }
    }
}

/// Open a WAL-mode pool, creating the database file and its directory if needed.
pub async fn create_pool(database_url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, ConnectionError> {
    let config = config.unwrap_or_default();
    if !database_url.starts_with("sqlite:") {
        return Err(ConnectionError::InvalidDatabaseUrl(database_url.to_string()));
    }

    let connect_options = SqliteConnectOptions::from_str(database_url)
        .map_err(|_| ConnectionError::InvalidDatabaseUrl(database_url.to_string()))?;
    ensure_database_directory(database_url)?;

    let connect_options = connect_options
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options)
        .await
        .map_err(ConnectionError::PoolCreationFailed)?;

    Ok(pool)
}

/// Create a pool, retrying with exponential backoff.
///
/// Gives up after `max_attempts` attempts. An invalid URL or an unusable
/// directory fails immediately.
pub async fn connect_with_retry(
    database_url: &str,
    config: Option<PoolConfig>,
    max_attempts: u32,
) -> Result<SqlitePool, ConnectionError> {
    let max_attempts = max_attempts.max(1);
    let attempts = AtomicU32::new(0);
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_secs(1))
        .with_max_interval(Duration::from_secs(10))
        .with_max_elapsed_time(None)
        .build();

    let attempts = &attempts;
    let config = &config;
    backoff::future::retry(policy, || async move {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        match create_pool(database_url, config.clone()).await {
            Ok(pool) => {
                tracing::info!(attempt, "Connected to database");
                Ok(pool)
            }
            Err(e @ ConnectionError::PoolCreationFailed(_)) if attempt < max_attempts => {
                tracing::warn!(attempt, max_attempts, error = %e, "Failed to connect to database");
                Err(backoff::Error::transient(e))
            }
            Err(e) => Err(backoff::Error::permanent(e)),
        }
    })
    .await
}

/// Single-connection in-memory pool for tests.
pub async fn create_test_pool() -> Result<SqlitePool, ConnectionError> {
    let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|_| ConnectionError::InvalidDatabaseUrl("sqlite::memory:".to_string()))?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .shared_cache(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options)
        .await
        .map_err(ConnectionError::PoolCreationFailed)
}

fn ensure_database_directory(database_url: &str) -> Result<(), ConnectionError> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let path = path.split('?').next().unwrap_or(path);

    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(ConnectionError::DirectoryCreationFailed)?;
        }
    }
    Ok(())
}

/// Run a trivial query against `pool`.
pub async fn verify_connection(pool: &SqlitePool) -> Result<(), ConnectionError> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(ConnectionError::ConnectionFailed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("cards.db");
        let url = format!("sqlite:{}", db_path.display());

        let pool = connect_with_retry(&url, None, 1).await.unwrap();
        verify_connection(&pool).await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_invalid_url_is_not_retried() {
        let result = connect_with_retry("postgres://nope", None, 5).await;
        assert!(matches!(result, Err(ConnectionError::InvalidDatabaseUrl(_))));
    }
}

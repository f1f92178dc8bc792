//! Durable language-name cache.
//!
//! Entries are insert-once: the first resolution of a code is stored and every
//! later lookup for that exact code (case-sensitive) is served from here.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub const INIT_SQL: &str = "CREATE TABLE IF NOT EXISTS languages (
    language_code TEXT PRIMARY KEY,
    language_name TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LanguageEntry {
    pub language_code: String,
    pub language_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value mapping from language code to language name.
pub trait LanguageStore: Send + Sync {
    /// Create the backing table if it does not exist yet. Idempotent.
    fn initialize(&self) -> BoxFuture<'_, StoreResult<()>>;

    fn find<'a>(&'a self, code: &'a str) -> BoxFuture<'a, StoreResult<Option<LanguageEntry>>>;

    /// Insert a new entry. Returns `false` when the code was already present;
    /// existing entries are never overwritten.
    fn insert<'a>(&'a self, code: &'a str, name: &'a str) -> BoxFuture<'a, StoreResult<bool>>;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgLanguageStore {
    pool: PgPool,
}

impl PgLanguageStore {
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl LanguageStore for PgLanguageStore {
    fn initialize(&self) -> BoxFuture<'_, StoreResult<()>> {
        async move {
            sqlx::query(INIT_SQL).execute(&self.pool).await?;
            Ok(())
        }
        .boxed()
    }

    fn find<'a>(&'a self, code: &'a str) -> BoxFuture<'a, StoreResult<Option<LanguageEntry>>> {
        async move {
            let entry = sqlx::query_as::<_, LanguageEntry>(
                "SELECT language_code, language_name, created_at
                 FROM languages
                 WHERE language_code = $1",
            )
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
            Ok(entry)
        }
        .boxed()
    }

    fn insert<'a>(&'a self, code: &'a str, name: &'a str) -> BoxFuture<'a, StoreResult<bool>> {
        async move {
            // Concurrent first resolutions race here; the first writer wins.
            let result = sqlx::query(
                "INSERT INTO languages (language_code, language_name)
                 VALUES ($1, $2)
                 ON CONFLICT (language_code) DO NOTHING",
            )
            .bind(code)
            .bind(name)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        }
        .boxed()
    }
}

/// Process-local store for development and tests. Contents are lost on exit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, LanguageEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find_sync(&self, code: &str) -> StoreResult<Option<LanguageEntry>> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(code).cloned())
    }

    fn insert_sync(&self, code: &str, name: &str) -> StoreResult<bool> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        if entries.contains_key(code) {
            return Ok(false);
        }
        entries.insert(
            code.to_string(),
            LanguageEntry {
                language_code: code.to_string(),
                language_name: name.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(true)
    }
}

impl LanguageStore for MemoryStore {
    fn initialize(&self) -> BoxFuture<'_, StoreResult<()>> {
        futures::future::ready(Ok(())).boxed()
    }

    fn find<'a>(&'a self, code: &'a str) -> BoxFuture<'a, StoreResult<Option<LanguageEntry>>> {
        futures::future::ready(self.find_sync(code)).boxed()
    }

    fn insert<'a>(&'a self, code: &'a str, name: &'a str) -> BoxFuture<'a, StoreResult<bool>> {
        futures::future::ready(self.insert_sync(code, name)).boxed()
    }
}

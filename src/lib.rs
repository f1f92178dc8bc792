//! Language name resolution service.
//!
//! `negotiate` picks a language code from a request, `resolver` turns it into
//! an English name (store first, inference backend on a miss) and `server`
//! renders the answer over HTTP.

pub mod config;
pub mod inference;
pub mod negotiate;
pub mod resolver;
pub mod retry;
pub mod server;
pub mod store;

use anyhow::{Context, Result};
use config::Config;
use inference::OpenAiNamer;
use resolver::Resolver;
use retry::{with_retry, RetryConfig};
use std::sync::Arc;
use store::{LanguageStore, MemoryStore, PgLanguageStore};
use tracing::{info, warn};

/// Open the configured store and create its schema. Runs once per process.
pub async fn open_store(config: &Config) -> Result<Arc<dyn LanguageStore>> {
    let store: Arc<dyn LanguageStore> = match &config.database_url {
        Some(url) => {
            let store = with_retry(&RetryConfig::store_startup(), "Database connection", || {
                PgLanguageStore::connect(url)
            })
            .await
            .context("Failed to connect to database")?;
            info!("Connected to PostgreSQL");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store (entries are lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    with_retry(&RetryConfig::store_startup(), "Schema initialization", || {
        store.initialize()
    })
    .await
    .context("Failed to initialize languages table")?;

    Ok(store)
}

/// Wire the store and the inference backend into a resolver
pub fn build_resolver(config: &Config, store: Arc<dyn LanguageStore>) -> Resolver {
    let namer = OpenAiNamer::new(reqwest::Client::new(), config);
    Resolver::new(
        store,
        Arc::new(namer),
        config.store_timeout(),
        config.inference_timeout(),
    )
}

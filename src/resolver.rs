//! Cache-then-inference resolution of language names.
//!
//! A stored name is returned as-is. On a miss the inference backend is asked
//! once; whatever it yields (or `"Unknown"` if it fails) is written back and
//! returned. Store failures never fail a request: a failed read is a miss and a
//! failed write is logged.

use crate::inference::LanguageNamer;
use crate::store::LanguageStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Name used when the inference backend cannot answer.
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Served from the store
    Cache,
    /// Freshly produced by the inference backend
    Inference,
    /// Inference failed; degraded to `UNKNOWN_LANGUAGE`
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub name: String,
    pub source: ResolutionSource,
}

#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn LanguageStore>,
    namer: Arc<dyn LanguageNamer>,
    store_timeout: Duration,
    inference_timeout: Duration,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn LanguageStore>,
        namer: Arc<dyn LanguageNamer>,
        store_timeout: Duration,
        inference_timeout: Duration,
    ) -> Self {
        Self {
            store,
            namer,
            store_timeout,
            inference_timeout,
        }
    }

    /// Resolve the English name of a normalized language code.
    pub async fn resolve(&self, code: &str) -> Resolution {
        if let Some(name) = self.cached_name(code).await {
            debug!(language_code = code, "Cache hit");
            return Resolution {
                name,
                source: ResolutionSource::Cache,
            };
        }

        debug!(language_code = code, "Cache miss, asking inference backend");
        let resolution = self.infer_name(code).await;
        self.persist(code, &resolution.name).await;
        resolution
    }

    async fn cached_name(&self, code: &str) -> Option<String> {
        match timeout(self.store_timeout, self.store.find(code)).await {
            Ok(Ok(entry)) => entry.map(|e| e.language_name),
            Ok(Err(e)) => {
                warn!(language_code = code, "Store lookup failed, treating as miss: {}", e);
                None
            }
            Err(_) => {
                warn!(
                    language_code = code,
                    "Store lookup timed out after {:?}, treating as miss", self.store_timeout
                );
                None
            }
        }
    }

    async fn infer_name(&self, code: &str) -> Resolution {
        match timeout(self.inference_timeout, self.namer.name_for(code)).await {
            Ok(Ok(name)) => {
                info!(language_code = code, language_name = %name, "Resolved language via inference");
                Resolution {
                    name,
                    source: ResolutionSource::Inference,
                }
            }
            Ok(Err(e)) => {
                error!(language_code = code, "AI detection error: {:#}", e);
                Self::fallback()
            }
            Err(_) => {
                error!(
                    language_code = code,
                    "AI detection timed out after {:?}", self.inference_timeout
                );
                Self::fallback()
            }
        }
    }

    async fn persist(&self, code: &str, name: &str) {
        match timeout(self.store_timeout, self.store.insert(code, name)).await {
            Ok(Ok(true)) => debug!(language_code = code, "Saved language to store"),
            Ok(Ok(false)) => {
                debug!(language_code = code, "Language already stored by a concurrent request")
            }
            Ok(Err(e)) => warn!(language_code = code, "Failed to save language: {}", e),
            Err(_) => warn!(
                language_code = code,
                "Saving language timed out after {:?}", self.store_timeout
            ),
        }
    }

    fn fallback() -> Resolution {
        Resolution {
            name: UNKNOWN_LANGUAGE.to_string(),
            source: ResolutionSource::Fallback,
        }
    }
}

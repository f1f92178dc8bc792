use crate::negotiate::{negotiate, NegotiationError};
use crate::resolver::Resolver;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for all requests
#[derive(Clone)]
pub struct AppState {
    pub resolver: Resolver,
    pub cache_max_age_secs: u32,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LanguageQuery {
    pub language_code: Option<String>,
    pub response_type: Option<String>,
}

impl LanguageQuery {
    /// Pick `languageCode` and `type` out of decoded query pairs. A repeated
    /// key keeps its first value; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "languageCode" if query.language_code.is_none() => {
                    query.language_code = Some(value)
                }
                "type" if query.response_type.is_none() => query.response_type = Some(value),
                _ => {}
            }
        }
        query
    }
}

/// Output mode selected by the `type` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Json,
}

impl ResponseFormat {
    /// `text` selects plain text; anything else (or nothing) is JSON.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("text") => Self::Text,
            _ => Self::Json,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageBody {
    pub language_code: String,
    pub language_name: String,
}

/// Render a resolved language in the requested format
pub fn render(
    format: ResponseFormat,
    language_code: String,
    language_name: String,
    cache_max_age_secs: u32,
) -> Response {
    let cache_control = format!("public, max-age={}", cache_max_age_secs);

    match format {
        ResponseFormat::Text => (
            [
                (header::CONTENT_TYPE, "text/plain".to_string()),
                (header::CACHE_CONTROL, cache_control),
            ],
            language_name,
        )
            .into_response(),
        ResponseFormat::Json => (
            [
                (header::CONTENT_TYPE, "application/json".to_string()),
                (header::CACHE_CONTROL, cache_control),
            ],
            Json(LanguageBody {
                language_code,
                language_name,
            }),
        )
            .into_response(),
    }
}

/// Language endpoint: negotiate, resolve, render
async fn language_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, NegotiationError> {
    let query = LanguageQuery::from_pairs(pairs);
    let accept_language = headers
        .get(header::ACCEPT_LANGUAGE)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    let language_code = negotiate(query.language_code.as_deref(), accept_language.as_deref())?;
    let resolution = state.resolver.resolve(&language_code).await;

    info!(
        language_code = %language_code,
        language_name = %resolution.name,
        source = ?resolution.source,
        "Language resolved"
    );

    Ok(render(
        ResponseFormat::from_param(query.response_type.as_deref()),
        language_code,
        resolution.name,
        state.cache_max_age_secs,
    ))
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Build the application router. Every path except `/health` serves the
/// language endpoint, for any method.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", any(language_handler))
        .fallback(language_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Serve until Ctrl-C or SIGTERM
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

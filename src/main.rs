use anyhow::{Context, Result};
use language_namer::{build_resolver, config::Config, open_store, server};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("language_namer=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!("Starting language name service");

    // Load configuration from environment
    let config = Config::from_env()?;
    info!("Using model {} at {}", config.openai_model, config.openai_api_url);

    // Schema is created once here, not per request
    let store = open_store(&config).await?;
    let state = server::AppState {
        resolver: build_resolver(&config, store),
        cache_max_age_secs: config.cache_max_age_secs,
    };

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;

    server::serve(listener, state).await
}

//! Lookup binary - resolves language codes once, through the same store and
//! inference backend as the server, and prints the names.
//!
//! Usage:
//!   cargo run --bin lookup -- en-US zh-CN   # Resolve (and cache) two codes
//!
//! Required environment variables:
//! - OPENAI_API_KEY
//!
//! Optional:
//! - DATABASE_URL (in-memory store when unset, so nothing is cached)
//! - OPENAI_MODEL (defaults to gpt-4o-mini)
//! - OPENAI_API_URL

use anyhow::Result;
use language_namer::{
    build_resolver, config::Config, negotiate::normalize_language_code, open_store,
};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("language_namer=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let codes: Vec<String> = std::env::args()
        .skip(1)
        .map(|arg| normalize_language_code(&arg))
        .filter(|code| !code.is_empty())
        .collect();

    if codes.is_empty() {
        anyhow::bail!("Usage: lookup <language-code> [<language-code>...]");
    }

    let config = Config::from_env()?;
    let store = open_store(&config).await?;
    let resolver = build_resolver(&config, store);

    for code in &codes {
        let resolution = resolver.resolve(code).await;
        println!("{}\t{}\t{:?}", code, resolution.name, resolution.source);
    }

    Ok(())
}

mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod pipeline;
mod rate_limit;
mod resume_text;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, SettingsStore};
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::pipeline::ResumePipeline;
use crate::rate_limit::InMemoryRateLimiter;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::SqliteStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume ranker v{}", env!("CARGO_PKG_VERSION"));

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.upload_dir.display()))?;

    // Initialize SQLite
    let db = create_pool(&config.database_url).await?;

    // Initialize LLM client
    let llm = LlmClient::new(config.gemini_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let policy = config.retry_policy();
    info!(
        "Resume pipeline: {} attempts per stage, {:?} per attempt",
        policy.max_attempts, policy.attempt_timeout
    );
    let pipeline = ResumePipeline::new(
        Arc::new(llm),
        Arc::new(SqliteStore::new(db.clone())),
        policy,
    );

    // Build app state
    let state = AppState {
        db,
        settings: Arc::new(SettingsStore::new(config.settings_path.clone())),
        rate_limiter: Arc::new(InMemoryRateLimiter::new()),
        pipeline: Arc::new(pipeline),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

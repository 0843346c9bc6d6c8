use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::{Config, SettingsStore};
use crate::pipeline::ResumePipeline;
use crate::rate_limit::RateLimiter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    /// Runtime feature toggles, re-read on every request.
    pub settings: Arc<SettingsStore>,
    /// Upload throttle. Default: InMemoryRateLimiter.
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub pipeline: Arc<ResumePipeline>,
}

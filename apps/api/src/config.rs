use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::error;

use crate::pipeline::retry::RetryPolicy;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gemini_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub upload_dir: PathBuf,
    pub settings_path: PathBuf,
    pub pipeline_max_attempts: u32,
    pub pipeline_attempt_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            database_url: var_or("DATABASE_URL", "sqlite:resume-ranker.db"),
            gemini_api_key: lookup("GEMINI_API_KEY").with_context(|| {
                "Required environment variable 'GEMINI_API_KEY' is not set".to_string()
            })?,
            port: var_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: var_or("RUST_LOG", "info"),
            upload_dir: PathBuf::from(var_or("UPLOAD_DIR", "public/uploads/resumes")),
            settings_path: PathBuf::from(var_or("SETTINGS_PATH", "config.json")),
            pipeline_max_attempts: var_or("PIPELINE_MAX_ATTEMPTS", "3")
                .parse::<u32>()
                .context("PIPELINE_MAX_ATTEMPTS must be a non-negative integer")?,
            pipeline_attempt_timeout_secs: var_or("PIPELINE_ATTEMPT_TIMEOUT_SECS", "45")
                .parse::<u64>()
                .context("PIPELINE_ATTEMPT_TIMEOUT_SECS must be a number of seconds")?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.pipeline_max_attempts,
            attempt_timeout: Duration::from_secs(self.pipeline_attempt_timeout_secs),
            ..RetryPolicy::default()
        }
    }
}

/// Feature toggles an operator can flip while the service is running.
/// Persisted as camelCase JSON so the file stays hand-editable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeSettings {
    /// Minimum seconds between uploads from one client. 0 disables the limit.
    pub upload_rate_limit_seconds: u64,
    pub enable_new_role_creation: bool,
    pub enable_resume_uploads: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            upload_rate_limit_seconds: 0,
            enable_new_role_creation: true,
            enable_resume_uploads: true,
        }
    }
}

/// Partial update merged into the current settings.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub upload_rate_limit_seconds: Option<u64>,
    pub enable_new_role_creation: Option<bool>,
    pub enable_resume_uploads: Option<bool>,
}

/// File-backed settings. Read fresh on every request so edits to the file
/// take effect without a restart.
pub struct SettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the current settings, falling back to defaults when the file
    /// is missing or unreadable.
    pub async fn load(&self) -> RuntimeSettings {
        match self.read().await {
            Ok(settings) => settings,
            Err(e) => {
                error!("Error reading settings from {}: {e:#}", self.path.display());
                RuntimeSettings::default()
            }
        }
    }

    pub async fn update(&self, update: SettingsUpdate) -> Result<RuntimeSettings> {
        let _guard = self.write_lock.lock().await;

        let mut settings = self.load().await;
        if let Some(v) = update.upload_rate_limit_seconds {
            settings.upload_rate_limit_seconds = v;
        }
        if let Some(v) = update.enable_new_role_creation {
            settings.enable_new_role_creation = v;
        }
        if let Some(v) = update.enable_resume_uploads {
            settings.enable_resume_uploads = v;
        }

        let body = serde_json::to_string_pretty(&settings)?;
        tokio::fs::write(&self.path, body)
            .await
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))?;

        Ok(settings)
    }

    async fn read(&self) -> Result<RuntimeSettings> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        department TEXT NOT NULL,
        location TEXT NOT NULL,
        type TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'open',
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS candidates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT,
        location TEXT,
        experience TEXT,
        education TEXT,
        current_role TEXT,
        resume_path TEXT,
        status TEXT NOT NULL DEFAULT 'in-review'
            CHECK (status IN ('in-review', 'shortlisted', 'rejected')),
        score INTEGER NOT NULL DEFAULT 0,
        applied_date TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS skills (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        candidate_id INTEGER NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
        skill_name TEXT NOT NULL,
        proficiency INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ai_assessments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        candidate_id INTEGER NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
        technical_score INTEGER NOT NULL,
        experience_score INTEGER NOT NULL,
        education_score INTEGER NOT NULL,
        cultural_score INTEGER NOT NULL,
        recommendation TEXT NOT NULL,
        detailed_comments TEXT NOT NULL,
        strengths TEXT NOT NULL,
        weaknesses TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_candidates_role ON candidates(role_id)",
    "CREATE INDEX IF NOT EXISTS idx_skills_candidate ON skills(candidate_id)",
    "CREATE INDEX IF NOT EXISTS idx_assessments_candidate ON ai_assessments(candidate_id)",
];

/// Child tables first so foreign keys never dangle mid-reset.
const TABLES: &[&str] = &["ai_assessments", "skills", "candidates", "roles"];

/// Creates the SQLite pool, creating the database file if needed, and
/// bootstraps the schema.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    info!("Connecting to SQLite at {database_url}...");

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid DATABASE_URL '{database_url}'"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await
        .context("Failed to connect to SQLite database")?;

    run_migrations(&pool).await?;

    info!("SQLite connection pool established");
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Database schema ready");
    Ok(())
}

/// Deletes every row and resets the AUTOINCREMENT counters.
pub async fn reset_all(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for table in TABLES {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await?;
    }
    for table in TABLES {
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = ?")
            .bind(*table)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    info!("All tables cleared");
    Ok(())
}

/// Single-connection in-memory database with the schema applied.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

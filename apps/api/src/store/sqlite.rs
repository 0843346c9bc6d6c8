use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::models::candidate::{Candidate, Skill};
use crate::store::{candidates, CandidateStore, CandidateUpdate, NewAssessment};

/// `CandidateStore` backed by the application's SQLite pool.
/// Each operation is a single statement; there are no cross-call transactions.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateStore for SqliteStore {
    async fn get_candidate(&self, id: i64) -> Result<Option<Candidate>> {
        candidates::get_candidate(&self.pool, id).await
    }

    async fn update_candidate(&self, id: i64, update: &CandidateUpdate) -> Result<()> {
        candidates::update_candidate(&self.pool, id, update).await
    }

    async fn get_skills(&self, candidate_id: i64) -> Result<Vec<Skill>> {
        candidates::get_skills(&self.pool, candidate_id).await
    }

    async fn add_skill(&self, candidate_id: i64, name: &str, proficiency: i64) -> Result<()> {
        candidates::add_skill(&self.pool, candidate_id, name, proficiency).await
    }

    async fn create_assessment(&self, assessment: &NewAssessment) -> Result<i64> {
        candidates::create_assessment(&self.pool, assessment).await
    }
}

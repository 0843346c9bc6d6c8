//! Candidate record store: the persistence contract the resume pipeline writes through.
//!
//! The pipeline only sees `CandidateStore`. Route handlers use the free query
//! functions in `candidates` and `roles` directly against the pool.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::candidate::{Candidate, CandidateStatus, Skill};

pub mod candidates;
pub mod roles;
pub mod sqlite;

pub use sqlite::SqliteStore;

/// Partial update of a candidate row. `None` leaves a column untouched; for
/// nullable columns `Some(None)` writes NULL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub experience: Option<Option<String>>,
    pub education: Option<Option<String>>,
    pub current_role: Option<Option<String>>,
    pub status: Option<CandidateStatus>,
    pub score: Option<i64>,
}

impl CandidateUpdate {
    pub fn is_empty(&self) -> bool {
        *self == CandidateUpdate::default()
    }
}

/// Fields of a new assessment row. Strengths and weaknesses are JSON-encoded arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAssessment {
    pub candidate_id: i64,
    pub technical_score: i64,
    pub experience_score: i64,
    pub education_score: i64,
    pub cultural_score: i64,
    pub recommendation: String,
    pub detailed_comments: String,
    pub strengths: String,
    pub weaknesses: String,
}

/// Row-level operations the pipeline needs. Every call is durable once it returns.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn get_candidate(&self, id: i64) -> Result<Option<Candidate>>;

    async fn update_candidate(&self, id: i64, update: &CandidateUpdate) -> Result<()>;

    /// Skills in insertion order.
    async fn get_skills(&self, candidate_id: i64) -> Result<Vec<Skill>>;

    async fn add_skill(&self, candidate_id: i64, name: &str, proficiency: i64) -> Result<()>;

    /// Returns the new assessment id.
    async fn create_assessment(&self, assessment: &NewAssessment) -> Result<i64>;
}

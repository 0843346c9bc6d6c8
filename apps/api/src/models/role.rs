use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub title: String,
    pub department: String,
    pub location: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub role_type: String,
    pub status: String,
    pub created_at: NaiveDateTime,
}

/// A role plus the number of candidates who applied to it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RoleSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub role: Role,
    pub applicants: i64,
}

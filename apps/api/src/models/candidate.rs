use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Placeholder values written by the upload handler before extraction runs.
pub const PLACEHOLDER_NAME: &str = "Processing...";
pub const PLACEHOLDER_EMAIL: &str = "processing@temp.com";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: i64,
    pub role_id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub current_role: Option<String>,
    pub resume_path: Option<String>,
    pub status: String,
    pub score: i64,
    pub applied_date: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Skill {
    pub id: i64,
    pub candidate_id: i64,
    pub skill_name: String,
    pub proficiency: i64,
}

/// Stored assessment. `strengths` and `weaknesses` hold JSON-encoded string arrays.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AiAssessment {
    pub id: i64,
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

/// Review status of a candidate. Only recruiters move a candidate out of `in-review`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateStatus {
    InReview,
    Shortlisted,
    Rejected,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::InReview => "in-review",
            CandidateStatus::Shortlisted => "shortlisted",
            CandidateStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Strong Hire")]
    StrongHire,
    #[serde(rename = "Hire")]
    Hire,
    #[serde(rename = "Maybe")]
    Maybe,
    #[serde(rename = "No Hire")]
    NoHire,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongHire => "Strong Hire",
            Recommendation::Hire => "Hire",
            Recommendation::Maybe => "Maybe",
            Recommendation::NoHire => "No Hire",
        }
    }
}

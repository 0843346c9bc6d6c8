use anyhow::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::candidate::{
    AiAssessment, Candidate, CandidateStatus, Skill, PLACEHOLDER_EMAIL, PLACEHOLDER_NAME,
};
use crate::store::{CandidateUpdate, NewAssessment};

/// Fields the upload handler owns when it first creates a candidate.
#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub role_id: i64,
    pub name: String,
    pub email: String,
    pub resume_path: Option<String>,
    pub status: CandidateStatus,
    pub score: i64,
}

impl NewCandidate {
    /// Placeholder row that resume processing fills in later.
    pub fn placeholder(role_id: i64, resume_path: &str) -> Self {
        Self {
            role_id,
            name: PLACEHOLDER_NAME.to_string(),
            email: PLACEHOLDER_EMAIL.to_string(),
            resume_path: Some(resume_path.to_string()),
            status: CandidateStatus::InReview,
            score: 0,
        }
    }
}

pub async fn create_candidate(pool: &SqlitePool, candidate: &NewCandidate) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO candidates (role_id, name, email, resume_path, status, score)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(candidate.role_id)
    .bind(&candidate.name)
    .bind(&candidate.email)
    .bind(&candidate.resume_path)
    .bind(candidate.status.as_str())
    .bind(candidate.score)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn get_candidate(pool: &SqlitePool, id: i64) -> Result<Option<Candidate>> {
    Ok(
        sqlx::query_as::<_, Candidate>("SELECT * FROM candidates WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}

/// Candidates for a role ranked by score, best first.
pub async fn candidates_by_role(pool: &SqlitePool, role_id: i64) -> Result<Vec<Candidate>> {
    Ok(sqlx::query_as::<_, Candidate>(
        "SELECT * FROM candidates WHERE role_id = ? ORDER BY score DESC, id ASC",
    )
    .bind(role_id)
    .fetch_all(pool)
    .await?)
}

pub async fn update_candidate(pool: &SqlitePool, id: i64, update: &CandidateUpdate) -> Result<()> {
    if update.is_empty() {
        return Ok(());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE candidates SET ");
    {
        let mut sets = query.separated(", ");
        if let Some(name) = &update.name {
            sets.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(email) = &update.email {
            sets.push("email = ").push_bind_unseparated(email.clone());
        }
        if let Some(phone) = &update.phone {
            sets.push("phone = ").push_bind_unseparated(phone.clone());
        }
        if let Some(location) = &update.location {
            sets.push("location = ").push_bind_unseparated(location.clone());
        }
        if let Some(experience) = &update.experience {
            sets.push("experience = ")
                .push_bind_unseparated(experience.clone());
        }
        if let Some(education) = &update.education {
            sets.push("education = ").push_bind_unseparated(education.clone());
        }
        if let Some(current_role) = &update.current_role {
            sets.push("current_role = ")
                .push_bind_unseparated(current_role.clone());
        }
        if let Some(status) = update.status {
            sets.push("status = ").push_bind_unseparated(status.as_str());
        }
        if let Some(score) = update.score {
            sets.push("score = ").push_bind_unseparated(score);
        }
    }
    query.push(" WHERE id = ").push_bind(id);

    query.build().execute(pool).await?;
    Ok(())
}

pub async fn get_skills(pool: &SqlitePool, candidate_id: i64) -> Result<Vec<Skill>> {
    Ok(
        sqlx::query_as::<_, Skill>("SELECT * FROM skills WHERE candidate_id = ? ORDER BY id")
            .bind(candidate_id)
            .fetch_all(pool)
            .await?,
    )
}

pub async fn add_skill(
    pool: &SqlitePool,
    candidate_id: i64,
    name: &str,
    proficiency: i64,
) -> Result<()> {
    sqlx::query("INSERT INTO skills (candidate_id, skill_name, proficiency) VALUES (?, ?, ?)")
        .bind(candidate_id)
        .bind(name)
        .bind(proficiency)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_assessment(pool: &SqlitePool, candidate_id: i64) -> Result<Option<AiAssessment>> {
    Ok(sqlx::query_as::<_, AiAssessment>(
        "SELECT * FROM ai_assessments WHERE candidate_id = ? ORDER BY id LIMIT 1",
    )
    .bind(candidate_id)
    .fetch_optional(pool)
    .await?)
}

pub async fn create_assessment(pool: &SqlitePool, assessment: &NewAssessment) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO ai_assessments
            (candidate_id, technical_score, experience_score, education_score, cultural_score,
             recommendation, detailed_comments, strengths, weaknesses)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(assessment.candidate_id)
    .bind(assessment.technical_score)
    .bind(assessment.experience_score)
    .bind(assessment.education_score)
    .bind(assessment.cultural_score)
    .bind(&assessment.recommendation)
    .bind(&assessment.detailed_comments)
    .bind(&assessment.strengths)
    .bind(&assessment.weaknesses)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn all_candidates(pool: &SqlitePool) -> Result<Vec<Candidate>> {
    Ok(sqlx::query_as::<_, Candidate>("SELECT * FROM candidates")
        .fetch_all(pool)
        .await?)
}

pub async fn all_skills(pool: &SqlitePool) -> Result<Vec<Skill>> {
    Ok(sqlx::query_as::<_, Skill>("SELECT * FROM skills")
        .fetch_all(pool)
        .await?)
}

pub async fn all_assessments(pool: &SqlitePool) -> Result<Vec<AiAssessment>> {
    Ok(sqlx::query_as::<_, AiAssessment>("SELECT * FROM ai_assessments")
        .fetch_all(pool)
        .await?)
}

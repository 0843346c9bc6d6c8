use std::time::Duration;

use anyhow::{anyhow, Context};
use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::candidate::{AiAssessment, Candidate, CandidateStatus, Skill};
use crate::rate_limit::{retry_after_secs, RateDecision};
use crate::resume_text::{extract_resume_text, sanitize_filename};
use crate::state::AppState;
use crate::store::candidates::{
    create_candidate, get_assessment, get_candidate, get_skills, update_candidate, NewCandidate,
};
use crate::store::roles::get_role;
use crate::store::CandidateUpdate;

const UPLOAD_MESSAGE: &str = "Resume uploaded successfully. AI analysis in progress.";
/// Public URL prefix under which `ServeDir` exposes the upload directory.
const RESUME_URL_PREFIX: &str = "/uploads/resumes";

#[derive(Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct CandidateDetailResponse {
    pub candidate: Candidate,
    pub skills: Vec<Skill>,
    pub assessment: Option<AiAssessment>,
}

/// Recruiter edits. Absent fields are left alone; `null` clears a nullable field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub experience: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub education: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub current_role: Option<Option<String>>,
    pub status: Option<CandidateStatus>,
    pub score: Option<i64>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<CandidatePatch> for CandidateUpdate {
    fn from(patch: CandidatePatch) -> Self {
        CandidateUpdate {
            name: patch.name,
            email: patch.email,
            phone: patch.phone,
            location: patch.location,
            experience: patch.experience,
            education: patch.education,
            current_role: patch.current_role,
            status: patch.status,
            score: patch.score,
        }
    }
}

/// The two parts of an upload form. Either may be missing.
#[derive(Default)]
struct UploadForm {
    role_id: Option<String>,
    resume: Option<(String, Bytes)>,
}

impl UploadForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid upload form: {e}")))?
        {
            match field.name() {
                Some("roleId") => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("Invalid roleId: {e}")))?;
                    form.role_id = Some(text).filter(|t| !t.trim().is_empty());
                }
                Some("resume") => {
                    let Some(file_name) = field.file_name().map(str::to_string) else {
                        continue;
                    };
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(format!("Invalid resume file: {e}")))?;
                    form.resume = Some((file_name, data));
                }
                _ => {}
            }
        }
        Ok(form)
    }
}

/// POST /api/candidates
/// Stores the resume, creates a placeholder candidate and starts AI processing
/// in the background. The response does not wait for processing.
pub async fn handle_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let settings = state.settings.load().await;

    if settings.upload_rate_limit_seconds > 0 {
        let client = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        let window = Duration::from_secs(settings.upload_rate_limit_seconds);
        if let RateDecision::RetryAfter(wait) = state.rate_limiter.check(client, window) {
            return Err(AppError::RateLimited {
                retry_after_secs: retry_after_secs(wait),
            });
        }
    }

    if !settings.enable_resume_uploads {
        return Err(AppError::Forbidden(
            "Resume uploads are currently disabled.".to_string(),
        ));
    }

    let form = UploadForm::read(&mut multipart).await?;
    let (Some(role_id), Some((file_name, data))) = (form.role_id, form.resume) else {
        return Err(AppError::Validation("Missing required fields".to_string()));
    };

    let role_not_found = || AppError::NotFound("Role not found".to_string());
    let role_id: i64 = role_id.trim().parse().map_err(|_| role_not_found())?;
    let role = get_role(&state.db, role_id)
        .await?
        .ok_or_else(role_not_found)?;

    let stored_name = format!(
        "{}_{}",
        Utc::now().timestamp_millis(),
        sanitize_filename(&file_name)
    );
    let stored_path = state.config.upload_dir.join(&stored_name);
    tokio::fs::write(&stored_path, &data)
        .await
        .with_context(|| format!("Failed to save resume to {}", stored_path.display()))?;
    info!("Resume saved to {}", stored_path.display());

    let resume_path = format!("{RESUME_URL_PREFIX}/{stored_name}");
    let candidate_id =
        create_candidate(&state.db, &NewCandidate::placeholder(role_id, &resume_path)).await?;
    info!("Candidate {candidate_id} created for role {role_id}");

    let resume_text = tokio::task::spawn_blocking(move || extract_resume_text(&data, &file_name))
        .await
        .context("Resume text extraction task failed")?;
    info!(
        "Resume text extracted for candidate {candidate_id}, length {}",
        resume_text.len()
    );

    // Detached: the run reports through the candidate rows and its own logs.
    drop(state.pipeline.spawn(candidate_id, resume_text, role.title));

    let candidate = get_candidate(&state.db, candidate_id)
        .await?
        .ok_or_else(|| anyhow!("Candidate {candidate_id} missing right after insert"))?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            candidate,
            message: UPLOAD_MESSAGE,
        }),
    ))
}

/// GET /api/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CandidateDetailResponse>, AppError> {
    let candidate = get_candidate(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Candidate not found".to_string()))?;
    let skills = get_skills(&state.db, id).await?;
    let assessment = get_assessment(&state.db, id).await?;

    Ok(Json(CandidateDetailResponse {
        candidate,
        skills,
        assessment,
    }))
}

/// PUT /api/candidates/:id
pub async fn handle_update_candidate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<CandidatePatch>,
) -> Result<Json<Candidate>, AppError> {
    if get_candidate(&state.db, id).await?.is_none() {
        return Err(AppError::NotFound("Candidate not found".to_string()));
    }

    let update = CandidateUpdate::from(patch);
    if let Err(e) = update_candidate(&state.db, id, &update).await {
        error!("Error updating candidate {id}: {e:#}");
        return Err(e.into());
    }

    let candidate = get_candidate(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Candidate not found".to_string()))?;
    Ok(Json(candidate))
}

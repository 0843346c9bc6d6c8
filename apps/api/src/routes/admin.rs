//! Operator endpoints: feature toggles, full reset, and a raw data dump.

use std::path::Path;

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::config::{RuntimeSettings, SettingsUpdate};
use crate::db::reset_all;
use crate::errors::AppError;
use crate::models::candidate::{AiAssessment, Candidate, Skill};
use crate::models::role::Role;
use crate::state::AppState;
use crate::store::candidates::{all_assessments, all_candidates, all_skills};
use crate::store::roles::all_roles;

/// Kept so the upload directory survives in version control.
const KEEP_FILE: &str = ".gitkeep";

#[derive(Serialize)]
pub struct ToggleResponse {
    pub message: &'static str,
    pub config: RuntimeSettings,
}

async fn apply_toggle(
    state: &AppState,
    update: SettingsUpdate,
    message: &'static str,
) -> Result<Json<ToggleResponse>, AppError> {
    let config = state.settings.update(update).await?;
    info!("{message}");
    Ok(Json(ToggleResponse { message, config }))
}

/// GET|POST /api/config/uploads/enable
pub async fn handle_enable_uploads(
    State(state): State<AppState>,
) -> Result<Json<ToggleResponse>, AppError> {
    let update = SettingsUpdate {
        enable_resume_uploads: Some(true),
        ..SettingsUpdate::default()
    };
    apply_toggle(&state, update, "Resume uploads enabled").await
}

/// GET|POST /api/config/uploads/disable
pub async fn handle_disable_uploads(
    State(state): State<AppState>,
) -> Result<Json<ToggleResponse>, AppError> {
    let update = SettingsUpdate {
        enable_resume_uploads: Some(false),
        ..SettingsUpdate::default()
    };
    apply_toggle(&state, update, "Resume uploads disabled").await
}

/// GET|POST /api/config/roles/enable
pub async fn handle_enable_roles(
    State(state): State<AppState>,
) -> Result<Json<ToggleResponse>, AppError> {
    let update = SettingsUpdate {
        enable_new_role_creation: Some(true),
        ..SettingsUpdate::default()
    };
    apply_toggle(&state, update, "Role creation enabled").await
}

/// GET|POST /api/config/roles/disable
pub async fn handle_disable_roles(
    State(state): State<AppState>,
) -> Result<Json<ToggleResponse>, AppError> {
    let update = SettingsUpdate {
        enable_new_role_creation: Some(false),
        ..SettingsUpdate::default()
    };
    apply_toggle(&state, update, "Role creation disabled").await
}

/// DELETE /api/reset
/// Clears every table and the stored resume files. File errors are logged, not returned.
pub async fn handle_reset(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    reset_all(&state.db).await?;

    if let Err(e) = clear_uploads(&state.config.upload_dir).await {
        error!(
            "Error deleting files in {}: {e}",
            state.config.upload_dir.display()
        );
    }

    Ok(Json(json!({
        "message": "Database and files reset successfully"
    })))
}

async fn clear_uploads(dir: &Path) -> std::io::Result<()> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut removed = 0usize;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name() == KEEP_FILE {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => warn!("Could not delete {}: {e}", entry.path().display()),
        }
    }
    info!("Deleted {removed} uploaded files");
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSummary {
    pub total_roles: usize,
    pub total_candidates: usize,
    pub total_skills: usize,
    pub total_assessments: usize,
}

#[derive(Serialize)]
pub struct DebugData {
    pub roles: Vec<Role>,
    pub candidates: Vec<Candidate>,
    pub skills: Vec<Skill>,
    pub assessments: Vec<AiAssessment>,
}

#[derive(Serialize)]
pub struct DebugResponse {
    pub summary: DebugSummary,
    pub data: DebugData,
}

/// GET /api/debug
pub async fn handle_debug(State(state): State<AppState>) -> Result<Json<DebugResponse>, AppError> {
    let data = DebugData {
        roles: all_roles(&state.db).await?,
        candidates: all_candidates(&state.db).await?,
        skills: all_skills(&state.db).await?,
        assessments: all_assessments(&state.db).await?,
    };

    Ok(Json(DebugResponse {
        summary: DebugSummary {
            total_roles: data.roles.len(),
            total_candidates: data.candidates.len(),
            total_skills: data.skills.len(),
            total_assessments: data.assessments.len(),
        },
        data,
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::SqlitePool;
    use tower::ServiceExt;

    use super::*;
    use crate::routes::build_router;
    use crate::store::candidates::{add_skill, create_candidate, NewCandidate};
    use crate::store::roles::{create_role, NewRole};
    use crate::testing::{read_json, test_app_state, ScriptedGenerator};

    async fn seed(db: &SqlitePool) -> i64 {
        let role_id = create_role(
            db,
            &NewRole {
                title: "QA Engineer".to_string(),
                department: "Eng".to_string(),
                location: "Remote".to_string(),
                role_type: "Contract".to_string(),
                status: "open".to_string(),
            },
        )
        .await
        .unwrap();
        let candidate_id =
            create_candidate(db, &NewCandidate::placeholder(role_id, "/cv.pdf"))
                .await
                .unwrap();
        add_skill(db, candidate_id, "Testing", 80).await.unwrap();
        role_id
    }

    #[tokio::test]
    async fn test_toggles_persist_and_echo_config() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_app_state(dir.path(), ScriptedGenerator::new()).await;
        let settings = state.settings.clone();
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/config/uploads/disable")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["message"], "Resume uploads disabled");
        assert_eq!(body["config"]["enableResumeUploads"], false);
        assert!(!settings.load().await.enable_resume_uploads);

        let response = app
            .oneshot(
                Request::get("/api/config/roles/disable")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = read_json(response).await;
        assert_eq!(body["config"]["enableNewRoleCreation"], false);
        assert_eq!(body["config"]["enableResumeUploads"], false);
    }

    #[tokio::test]
    async fn test_debug_dump_counts_rows() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_app_state(dir.path(), ScriptedGenerator::new()).await;
        seed(&state.db).await;

        let response = build_router(state)
            .oneshot(Request::get("/api/debug").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = read_json(response).await;
        assert_eq!(body["summary"]["totalRoles"], 1);
        assert_eq!(body["summary"]["totalCandidates"], 1);
        assert_eq!(body["summary"]["totalSkills"], 1);
        assert_eq!(body["summary"]["totalAssessments"], 0);
        assert_eq!(body["data"]["skills"][0]["skill_name"], "Testing");
    }

    #[tokio::test]
    async fn test_reset_clears_rows_counters_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_app_state(dir.path(), ScriptedGenerator::new()).await;
        let upload_dir = state.config.upload_dir.clone();
        std::fs::write(upload_dir.join(KEEP_FILE), "").unwrap();
        std::fs::write(upload_dir.join("1_cv.pdf"), "pdf").unwrap();
        seed(&state.db).await;
        let db = state.db.clone();

        let response = build_router(state)
            .oneshot(Request::delete("/api/reset").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert!(all_roles(&db).await.unwrap().is_empty());
        assert!(all_candidates(&db).await.unwrap().is_empty());
        assert!(upload_dir.join(KEEP_FILE).exists());
        assert!(!upload_dir.join("1_cv.pdf").exists());

        // AUTOINCREMENT starts over.
        assert_eq!(seed(&db).await, 1);
    }
}

use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::candidate::Candidate;
use crate::models::role::{Role, RoleSummary};
use crate::state::AppState;
use crate::store::candidates::candidates_by_role;
use crate::store::roles::{create_role, get_role, list_roles, NewRole};

const DEFAULT_ROLE_STATUS: &str = "open";

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub title: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub role_type: Option<String>,
    pub status: Option<String>,
}

impl CreateRoleRequest {
    fn into_new_role(self) -> Result<NewRole, AppError> {
        let (Some(title), Some(department), Some(location), Some(role_type)) = (
            non_blank(self.title),
            non_blank(self.department),
            non_blank(self.location),
            non_blank(self.role_type),
        ) else {
            return Err(AppError::Validation("Missing required fields".to_string()));
        };

        Ok(NewRole {
            title,
            department,
            location,
            role_type,
            status: non_blank(self.status).unwrap_or_else(|| DEFAULT_ROLE_STATUS.to_string()),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Serialize)]
pub struct RoleDetailResponse {
    pub role: Role,
    pub candidates: Vec<Candidate>,
}

/// GET /api/roles
pub async fn handle_list_roles(
    State(state): State<AppState>,
) -> Result<Json<Vec<RoleSummary>>, AppError> {
    Ok(Json(list_roles(&state.db).await?))
}

/// POST /api/roles
pub async fn handle_create_role(
    State(state): State<AppState>,
    Json(req): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    let settings = state.settings.load().await;
    if !settings.enable_new_role_creation {
        return Err(AppError::Forbidden(
            "New role creation is currently disabled".to_string(),
        ));
    }

    let new_role = req.into_new_role()?;
    let id = create_role(&state.db, &new_role).await?;
    let role = get_role(&state.db, id)
        .await?
        .ok_or_else(|| anyhow!("Role {id} missing right after insert"))?;

    info!("Created role {id}: {}", role.title);
    Ok((StatusCode::CREATED, Json(role)))
}

/// GET /api/roles/:id
pub async fn handle_get_role(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RoleDetailResponse>, AppError> {
    let role = get_role(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Role not found".to_string()))?;
    let candidates = candidates_by_role(&state.db, id).await?;
    Ok(Json(RoleDetailResponse { role, candidates }))
}

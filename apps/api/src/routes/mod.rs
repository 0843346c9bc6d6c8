pub mod admin;
pub mod candidates;
pub mod health;
pub mod roles;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::state::AppState;

/// Resumes above this size are rejected before the handler runs.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/health", get(health::health_handler))
        // Roles
        .route(
            "/api/roles",
            get(roles::handle_list_roles).post(roles::handle_create_role),
        )
        .route("/api/roles/:id", get(roles::handle_get_role))
        // Candidates
        .route(
            "/api/candidates",
            post(candidates::handle_upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/candidates/:id",
            get(candidates::handle_get_candidate).put(candidates::handle_update_candidate),
        )
        // Operator toggles (GET kept so they can be flipped from a browser)
        .route(
            "/api/config/uploads/enable",
            get(admin::handle_enable_uploads).post(admin::handle_enable_uploads),
        )
        .route(
            "/api/config/uploads/disable",
            get(admin::handle_disable_uploads).post(admin::handle_disable_uploads),
        )
        .route(
            "/api/config/roles/enable",
            get(admin::handle_enable_roles).post(admin::handle_enable_roles),
        )
        .route(
            "/api/config/roles/disable",
            get(admin::handle_disable_roles).post(admin::handle_disable_roles),
        )
        .route("/api/reset", delete(admin::handle_reset))
        .route("/api/debug", get(admin::handle_debug))
        .nest_service("/uploads/resumes", uploads)
        .with_state(state)
}

use anyhow::Result;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::models::role::{Role, RoleSummary};

#[derive(Debug, Clone, Deserialize)]
pub struct NewRole {
    pub title: String,
    pub department: String,
    pub location: String,
    #[serde(rename = "type")]
    pub role_type: String,
    pub status: String,
}

/// All roles with their applicant counts, newest first.
pub async fn list_roles(pool: &SqlitePool) -> Result<Vec<RoleSummary>> {
    let roles = sqlx::query_as::<_, RoleSummary>(
        r#"
        SELECT r.*, COUNT(DISTINCT c.id) AS applicants
        FROM roles r
        LEFT JOIN candidates c ON r.id = c.role_id
        GROUP BY r.id
        ORDER BY r.created_at DESC, r.id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(roles)
}

pub async fn get_role(pool: &SqlitePool, id: i64) -> Result<Option<Role>> {
    let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(role)
}

pub async fn create_role(pool: &SqlitePool, role: &NewRole) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO roles (title, department, location, type, status) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&role.title)
    .bind(&role.department)
    .bind(&role.location)
    .bind(&role.role_type)
    .bind(&role.status)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn all_roles(pool: &SqlitePool) -> Result<Vec<Role>> {
    Ok(sqlx::query_as::<_, Role>("SELECT * FROM roles")
        .fetch_all(pool)
        .await?)
}

//! Minimal admin user management

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use cadence_common::db::models::{Role, User};

use crate::api::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub manager_id: Option<String>,
}

/// POST /api/users (admin only)
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(req): Json<CreateRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if !caller.role.is_admin() {
        return Err(ApiError::Forbidden("only an admin may create users".to_string()));
    }
    if req.name.is_empty() || req.email.is_empty() {
        return Err(ApiError::Validation("name and email are required".to_string()));
    }
    if let Some(manager_id) = &req.manager_id {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(manager_id)
            .fetch_one(&state.db)
            .await?;
        if exists == 0 {
            return Err(ApiError::Validation("manager not found".to_string()));
        }
    }

    let now = Utc::now();
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, role, manager_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&req.name)
    .bind(&req.email)
    .bind(req.role.as_str())
    .bind(&req.manager_id)
    .bind(now)
    .bind(now)
    .execute(&state.db)
    .await?;

    let row = sqlx::query("SELECT * FROM users WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok((StatusCode::CREATED, Json(User::from_row(&row)?)))
}

/// GET /api/users (admin only)
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Vec<User>>> {
    if !caller.role.is_admin() {
        return Err(ApiError::Forbidden("only an admin may list users".to_string()));
    }

    let rows = sqlx::query("SELECT * FROM users ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    let users = rows
        .iter()
        .map(User::from_row)
        .collect::<cadence_common::Result<Vec<_>>>()?;
    Ok(Json(users))
}

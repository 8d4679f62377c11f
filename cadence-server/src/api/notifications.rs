//! In-app notification endpoints

use axum::extract::{Path, State};
use axum::Json;

use cadence_common::db::models::Notification;

use crate::api::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/notifications
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Vec<Notification>>> {
    let rows = sqlx::query(
        "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC LIMIT 100",
    )
    .bind(&caller.id)
    .fetch_all(&state.db)
    .await?;

    let notifications = rows
        .iter()
        .map(Notification::from_row)
        .collect::<cadence_common::Result<Vec<_>>>()?;
    Ok(Json(notifications))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Notification>> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(&id)
        .bind(&caller.id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("notification not found".to_string()));
    }

    let row = sqlx::query("SELECT * FROM notifications WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    Ok(Json(Notification::from_row(&row)?))
}

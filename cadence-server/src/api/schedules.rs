//! Recurring schedule endpoints

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use cadence_common::db::models::{Frequency, RecurringSchedule};

use crate::api::auth::CurrentUser;
use crate::error::ApiResult;
use crate::schedule;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub employee_id: String,
    pub frequency: Frequency,
    pub day_of_week: i64,
    pub time_of_day: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub frequency: Option<Frequency>,
    pub day_of_week: Option<i64>,
    pub time_of_day: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub cancel_future: bool,
}

/// POST /api/recurring-schedules
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(req): Json<CreateRequest>,
) -> ApiResult<(StatusCode, Json<RecurringSchedule>)> {
    let created = schedule::create_schedule(
        &state.db,
        &state.effects,
        &caller,
        &req.employee_id,
        req.frequency,
        req.day_of_week,
        &req.time_of_day,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/recurring-schedules
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Vec<RecurringSchedule>>> {
    let rows = if caller.role.is_admin() {
        sqlx::query("SELECT * FROM recurring_schedules ORDER BY created_at")
            .fetch_all(&state.db)
            .await?
    } else {
        sqlx::query(
            "SELECT * FROM recurring_schedules
             WHERE reporter_id = ? OR employee_id = ?
             ORDER BY created_at",
        )
        .bind(&caller.id)
        .bind(&caller.id)
        .fetch_all(&state.db)
        .await?
    };

    let schedules = rows
        .iter()
        .map(RecurringSchedule::from_row)
        .collect::<cadence_common::Result<Vec<_>>>()?;
    Ok(Json(schedules))
}

/// PATCH /api/recurring-schedules/:id
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> ApiResult<Json<RecurringSchedule>> {
    let updated = schedule::update_schedule(
        &state.db,
        &caller,
        &id,
        req.frequency,
        req.day_of_week,
        req.time_of_day.as_deref(),
    )
    .await?;
    Ok(Json(updated))
}

/// DELETE /api/recurring-schedules/:id?cancel_future=true
pub async fn deactivate(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<Json<RecurringSchedule>> {
    let deactivated = schedule::deactivate_schedule(
        &state.db,
        &state.effects,
        &caller,
        &id,
        query.cancel_future,
    )
    .await?;
    Ok(Json(deactivated))
}

//! Meeting endpoints
//!
//! Handlers stay thin: parse the payload, hand off to the state machine,
//! map the tagged result onto a status code via `From<TransitionError>`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use cadence_common::db::models::{Meeting, MeetingStatus};

use crate::api::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::meetings::{self, FormFields};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeRequest {
    pub employee_id: String,
    pub meeting_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    pub meeting_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub meeting_date: Option<DateTime<Utc>>,
    pub status: Option<MeetingStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRequest {
    pub check_in: Option<String>,
    pub goals: Option<String>,
    pub progress: Option<String>,
    pub challenges: Option<String>,
    pub notes: Option<String>,
}

/// POST /api/meetings
pub async fn propose(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(req): Json<ProposeRequest>,
) -> ApiResult<(StatusCode, Json<Meeting>)> {
    let meeting = meetings::propose(
        &state.db,
        &state.effects,
        &caller,
        &req.employee_id,
        req.meeting_date,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

/// GET /api/meetings
///
/// Admins see everything; everyone else sees meetings they take part in
/// plus the meetings of their direct reports.
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Vec<Meeting>>> {
    let rows = if caller.role.is_admin() {
        sqlx::query("SELECT * FROM meetings ORDER BY meeting_date DESC")
            .fetch_all(&state.db)
            .await?
    } else {
        sqlx::query(
            r#"
            SELECT * FROM meetings
            WHERE employee_id = ? OR reporter_id = ?
               OR employee_id IN (SELECT id FROM users WHERE manager_id = ?)
            ORDER BY meeting_date DESC
            "#,
        )
        .bind(&caller.id)
        .bind(&caller.id)
        .bind(&caller.id)
        .fetch_all(&state.db)
        .await?
    };

    let meetings = rows
        .iter()
        .map(Meeting::from_row)
        .collect::<cadence_common::Result<Vec<_>>>()?;
    Ok(Json(meetings))
}

/// GET /api/meetings/:id
pub async fn get(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Meeting>> {
    let meeting = meetings::find_meeting(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("meeting not found".to_string()))?;

    let manages_employee: Option<String> =
        sqlx::query_scalar("SELECT manager_id FROM users WHERE id = ?")
            .bind(&meeting.employee_id)
            .fetch_optional(&state.db)
            .await?
            .flatten();

    let allowed = caller.role.is_admin()
        || meeting.is_participant(&caller.id)
        || manages_employee.as_deref() == Some(caller.id.as_str());
    if !allowed {
        return Err(ApiError::Forbidden(
            "you are not a participant in this meeting".to_string(),
        ));
    }

    Ok(Json(meeting))
}

/// POST /api/meetings/:id/accept
pub async fn accept(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Meeting>> {
    let meeting = meetings::accept(&state.db, &state.effects, &caller, &id).await?;
    Ok(Json(meeting))
}

/// POST /api/meetings/:id/suggest
pub async fn suggest(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<SuggestRequest>,
) -> ApiResult<Json<Meeting>> {
    let meeting =
        meetings::suggest(&state.db, &state.effects, &caller, &id, req.meeting_date).await?;
    Ok(Json(meeting))
}

/// PATCH /api/meetings/:id
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> ApiResult<Json<Meeting>> {
    let meeting = meetings::update(
        &state.db,
        &state.effects,
        &caller,
        &id,
        req.meeting_date,
        req.status,
    )
    .await?;
    Ok(Json(meeting))
}

/// DELETE /api/meetings/:id
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    meetings::delete(&state.db, &state.effects, &caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/meetings/:id/form
pub async fn submit_form(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<FormRequest>,
) -> ApiResult<Json<Meeting>> {
    let fields = FormFields {
        check_in: req.check_in,
        goals: req.goals,
        progress: req.progress,
        challenges: req.challenges,
        notes: req.notes,
    };
    let meeting = meetings::submit_form(&state.db, &caller, &id, fields).await?;
    Ok(Json(meeting))
}

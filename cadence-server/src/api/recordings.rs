//! Recording endpoints
//!
//! The audio file itself is stored by the drive collaborator before this
//! call; the request carries the stored path. Processing runs detached, the
//! client polls the GET endpoint for the outcome.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use cadence_common::db::models::Recording;

use crate::api::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::meetings;
use crate::recordings;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub file_path: String,
}

/// POST /api/meetings/:id/recordings
pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(meeting_id): Path<String>,
    Json(req): Json<UploadRequest>,
) -> ApiResult<(StatusCode, Json<Recording>)> {
    let recording = recordings::start_pipeline(
        &state.db,
        &state.effects,
        &caller.id,
        caller.role.is_admin(),
        &meeting_id,
        &req.file_path,
    )
    .await?;
    Ok((StatusCode::ACCEPTED, Json(recording)))
}

/// GET /api/recordings/:id
pub async fn get(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Recording>> {
    let recording = recordings::find_recording(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("recording not found".to_string()))?;

    let meeting = meetings::find_meeting(&state.db, &recording.meeting_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("meeting not found".to_string()))?;
    if !meeting.is_participant(&caller.id) && !caller.role.is_admin() {
        return Err(ApiError::Forbidden(
            "you are not a participant in this meeting".to_string(),
        ));
    }

    Ok(Json(recording))
}

//! Audio recording pipeline
//!
//! Upload persists an UPLOADED row and returns immediately; a detached task
//! walks TRANSCRIBING -> ANALYZING -> COMPLETED, persisting the status at
//! each stage so pollers see progress. Any stage failure lands in FAILED
//! with an error message. There is no resume: a process restart mid-pipeline
//! leaves the recording in its last persisted stage.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{error, info};
use uuid::Uuid;

use cadence_common::db::models::{Recording, RecordingStatus};

use crate::effects::Effects;
use crate::meetings::{self, TransitionError};

type Result<T> = std::result::Result<T, TransitionError>;

pub async fn find_recording(
    pool: &SqlitePool,
    id: &str,
) -> std::result::Result<Option<Recording>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM recordings WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref()
        .map(|r| Recording::from_row(r).map_err(|e| sqlx::Error::Decode(e.to_string().into())))
        .transpose()
}

/// Register an uploaded file against a meeting and kick off processing.
///
/// Only meeting participants (or an admin) may attach a recording. The
/// returned row is still UPLOADED; callers poll `find_recording` for the
/// outcome.
pub async fn start_pipeline(
    pool: &SqlitePool,
    effects: &Effects,
    caller_id: &str,
    is_admin: bool,
    meeting_id: &str,
    file_path: &str,
) -> Result<Recording> {
    let meeting = meetings::find_meeting(pool, meeting_id)
        .await?
        .ok_or(TransitionError::NotFound)?;

    if !meeting.is_participant(caller_id) && !is_admin {
        return Err(TransitionError::Unauthorized(
            "only a meeting participant may attach a recording".to_string(),
        ));
    }
    if file_path.is_empty() {
        return Err(TransitionError::Validation(
            "file_path must not be empty".to_string(),
        ));
    }

    let now = Utc::now();
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO recordings (id, meeting_id, file_path, status, created_at, updated_at)
        VALUES (?, ?, ?, 'UPLOADED', ?, ?)
        "#,
    )
    .bind(&id)
    .bind(meeting_id)
    .bind(file_path)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let recording = find_recording(pool, &id)
        .await?
        .ok_or(TransitionError::NotFound)?;

    spawn_processing(pool.clone(), effects.clone(), recording.clone());

    Ok(recording)
}

fn spawn_processing(pool: SqlitePool, effects: Effects, recording: Recording) {
    tokio::spawn(async move {
        let id = recording.id.clone();
        if let Err(e) = process(&pool, &effects, recording).await {
            error!(recording_id = %id, "recording pipeline failed: {}", e);
            if let Err(db_err) = mark_failed(&pool, &id, &e.to_string()).await {
                error!(recording_id = %id, "could not persist failure: {}", db_err);
            }
        }
    });
}

async fn process(
    pool: &SqlitePool,
    effects: &Effects,
    recording: Recording,
) -> cadence_common::Result<()> {
    set_status(pool, &recording.id, RecordingStatus::Transcribing).await?;
    let transcript = effects.transcriber.transcribe(&recording.file_path).await?;
    sqlx::query("UPDATE recordings SET transcript = ?, updated_at = ? WHERE id = ?")
        .bind(&transcript)
        .bind(Utc::now())
        .bind(&recording.id)
        .execute(pool)
        .await?;

    set_status(pool, &recording.id, RecordingStatus::Analyzing).await?;
    let summary = effects.transcriber.summarize(&transcript).await?;
    sqlx::query(
        "UPDATE recordings SET summary = ?, status = 'COMPLETED', updated_at = ? WHERE id = ?",
    )
    .bind(&summary)
    .bind(Utc::now())
    .bind(&recording.id)
    .execute(pool)
    .await?;

    info!(recording_id = %recording.id, "recording pipeline completed");
    Ok(())
}

async fn set_status(
    pool: &SqlitePool,
    id: &str,
    status: RecordingStatus,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query("UPDATE recordings SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn mark_failed(
    pool: &SqlitePool,
    id: &str,
    message: &str,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE recordings SET status = 'FAILED', error_message = ?, updated_at = ? WHERE id = ?",
    )
    .bind(message)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

//! Meeting state machine
//!
//! All lifecycle transitions live here as named operations; HTTP handlers
//! never compare status strings themselves. Each operation checks the actor,
//! checks the current state, performs the write, and only then fires
//! best-effort side effects; a failed notification or calendar call never
//! rolls back a committed transition.
//!
//! States: PROPOSED -> SCHEDULED -> {COMPLETED | CANCELLED}; PROPOSED may
//! also resolve to CANCELLED, and admins may hard-delete from any state.

pub mod conflict;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use cadence_common::access::can_access;
use cadence_common::db::models::{Meeting, MeetingStatus, User};

use crate::effects::{best_effort, Effects};
use crate::error::ApiError;

/// Expected-but-disallowed transition outcomes, kept distinct from HTTP
/// concerns so the guards are testable on their own
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("meeting not found")]
    NotFound,

    #[error("cannot {action} a meeting in {status} status")]
    InvalidState {
        action: &'static str,
        status: MeetingStatus,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Common(#[from] cadence_common::Error),
}

impl From<TransitionError> for ApiError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::NotFound => ApiError::NotFound("meeting not found".to_string()),
            TransitionError::InvalidState { .. } => ApiError::Validation(e.to_string()),
            TransitionError::Unauthorized(msg) => ApiError::Forbidden(msg),
            TransitionError::Conflict(msg) => ApiError::Conflict(msg),
            TransitionError::Validation(msg) => ApiError::Validation(msg),
            TransitionError::Database(err) => err.into(),
            TransitionError::Common(err) => err.into(),
        }
    }
}

type Result<T> = std::result::Result<T, TransitionError>;

/// Free-text form fields written by the employee
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    pub check_in: Option<String>,
    pub goals: Option<String>,
    pub progress: Option<String>,
    pub challenges: Option<String>,
    pub notes: Option<String>,
}

pub async fn find_meeting(
    pool: &SqlitePool,
    id: &str,
) -> std::result::Result<Option<Meeting>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM meetings WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref()
        .map(|r| Meeting::from_row(r).map_err(|e| sqlx::Error::Decode(e.to_string().into())))
        .transpose()
}

async fn load(pool: &SqlitePool, id: &str) -> Result<Meeting> {
    find_meeting(pool, id).await?.ok_or(TransitionError::NotFound)
}

async fn find_user(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(User::from_row).transpose()?)
}

/// Create a meeting in PROPOSED state.
///
/// The caller becomes the reporter and the proposer. Creation is rejected
/// with a descriptive conflict when either party already holds an active
/// meeting inside the ±29 minute window; the conflict check and the insert
/// share one transaction so two concurrent requests cannot double-book a
/// slot.
pub async fn propose(
    pool: &SqlitePool,
    effects: &Effects,
    caller: &User,
    employee_id: &str,
    meeting_date: DateTime<Utc>,
) -> Result<Meeting> {
    let employee = find_user(pool, employee_id)
        .await?
        .ok_or(TransitionError::NotFound)?;

    if employee.id == caller.id {
        return Err(TransitionError::Validation(
            "cannot schedule a one-on-one with yourself".to_string(),
        ));
    }
    if !can_access(caller.role, &caller.id, &employee.id, employee.manager_id.as_deref()) {
        return Err(TransitionError::Unauthorized(
            "only the employee's manager or an admin may schedule this meeting".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    if let Some(hit) =
        conflict::find_conflict(&mut *tx, meeting_date, &employee.id, &caller.id, None).await?
    {
        return Err(TransitionError::Conflict(hit.describe(&employee.id, &caller.id)));
    }

    let now = Utc::now();
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO meetings (id, employee_id, reporter_id, meeting_date, status,
                              proposed_by_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'PROPOSED', ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&employee.id)
    .bind(&caller.id)
    .bind(meeting_date)
    .bind(&caller.id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let meeting = load(pool, &id).await?;
    effects
        .notify_user(
            &employee.id,
            "meeting_proposed",
            &format!("{} proposed a one-on-one meeting", caller.name),
            Some(&meeting.id),
        )
        .await;

    Ok(meeting)
}

/// Accept a pending proposal: PROPOSED -> SCHEDULED.
///
/// Only the receiver (the non-proposer participant) or an admin may accept;
/// the current proposer can never accept their own proposal.
pub async fn accept(
    pool: &SqlitePool,
    effects: &Effects,
    caller: &User,
    meeting_id: &str,
) -> Result<Meeting> {
    let meeting = load(pool, meeting_id).await?;

    if meeting.status != MeetingStatus::Proposed {
        return Err(TransitionError::InvalidState {
            action: "accept",
            status: meeting.status,
        });
    }
    let is_receiver = meeting.is_participant(&caller.id)
        && meeting.proposed_by_id.as_deref() != Some(caller.id.as_str());
    if !is_receiver && !caller.role.is_admin() {
        return Err(TransitionError::Unauthorized(
            "only the receiving participant may accept this proposal".to_string(),
        ));
    }

    set_status(pool, meeting_id, MeetingStatus::Scheduled).await?;
    let mut meeting = load(pool, meeting_id).await?;

    // Calendar event is created after the transition commits; a failure here
    // is logged and the meeting stays SCHEDULED without an event id.
    match effects.calendar.create_event(&meeting).await {
        Ok(event_id) if !event_id.is_empty() => {
            sqlx::query("UPDATE meetings SET calendar_event_id = ? WHERE id = ?")
                .bind(&event_id)
                .bind(meeting_id)
                .execute(pool)
                .await?;
            meeting.calendar_event_id = Some(event_id);
        }
        Ok(_) => {}
        Err(e) => warn!("calendar side effect failed: {}", e),
    }

    if let Some(proposer) = meeting.proposed_by_id.clone() {
        effects
            .notify_user(
                &proposer,
                "meeting_accepted",
                &format!("{} accepted the proposed meeting time", caller.name),
                Some(&meeting.id),
            )
            .await;
    }

    Ok(meeting)
}

/// Move a pending proposal to a new time.
///
/// When the receiver suggests, the proposer role flips to them; when the
/// current proposer edits their own pending proposal, the date changes and
/// the roles stay put, re-notifying the other party as a fresh proposal. An
/// admin who is not a participant flips the proposal to the current receiver
/// so the proposer always remains one of the two participants.
pub async fn suggest(
    pool: &SqlitePool,
    effects: &Effects,
    caller: &User,
    meeting_id: &str,
    new_date: DateTime<Utc>,
) -> Result<Meeting> {
    let meeting = load(pool, meeting_id).await?;

    if meeting.status != MeetingStatus::Proposed {
        return Err(TransitionError::InvalidState {
            action: "suggest a new time for",
            status: meeting.status,
        });
    }
    if !meeting.is_participant(&caller.id) && !caller.role.is_admin() {
        return Err(TransitionError::Unauthorized(
            "only a participant may suggest a new time".to_string(),
        ));
    }

    let previous_proposer = meeting.proposed_by_id.clone();
    let new_proposer = if meeting.is_participant(&caller.id) {
        caller.id.clone()
    } else {
        // Admin acting on behalf of the receiver
        meeting
            .receiver_id()
            .unwrap_or(meeting.reporter_id.as_str())
            .to_string()
    };

    let now = Utc::now();
    sqlx::query(
        "UPDATE meetings SET meeting_date = ?, proposed_by_id = ?, updated_at = ? WHERE id = ?",
    )
    .bind(new_date)
    .bind(&new_proposer)
    .bind(now)
    .bind(meeting_id)
    .execute(pool)
    .await?;

    let meeting = load(pool, meeting_id).await?;

    // Notify whoever now has to respond; on a proposer self-edit that is the
    // unchanged receiver, otherwise the previous proposer.
    let respondent = if previous_proposer.as_deref() == Some(new_proposer.as_str()) {
        meeting.receiver_id().map(str::to_string)
    } else {
        previous_proposer
    };
    if let Some(user_id) = respondent {
        effects
            .notify_user(
                &user_id,
                "meeting_time_suggested",
                &format!(
                    "{} suggested a new time for your one-on-one",
                    caller.name
                ),
                Some(&meeting.id),
            )
            .await;
    }

    Ok(meeting)
}

/// SCHEDULED -> COMPLETED, by the reporter or an admin
pub async fn complete(
    pool: &SqlitePool,
    effects: &Effects,
    caller: &User,
    meeting_id: &str,
) -> Result<Meeting> {
    let meeting = load(pool, meeting_id).await?;

    if meeting.reporter_id != caller.id && !caller.role.is_admin() {
        return Err(TransitionError::Unauthorized(
            "only the reporter may complete this meeting".to_string(),
        ));
    }
    if meeting.status != MeetingStatus::Scheduled {
        return Err(TransitionError::InvalidState {
            action: "complete",
            status: meeting.status,
        });
    }

    set_status(pool, meeting_id, MeetingStatus::Completed).await?;
    let meeting = load(pool, meeting_id).await?;

    effects
        .notify_user(
            &meeting.employee_id,
            "meeting_completed",
            "Your one-on-one was marked completed",
            Some(&meeting.id),
        )
        .await;

    Ok(meeting)
}

/// PROPOSED or SCHEDULED -> CANCELLED, by the reporter or an admin.
/// Deletes any linked calendar event, best-effort.
pub async fn cancel(
    pool: &SqlitePool,
    effects: &Effects,
    caller: &User,
    meeting_id: &str,
) -> Result<Meeting> {
    let meeting = load(pool, meeting_id).await?;

    if meeting.reporter_id != caller.id && !caller.role.is_admin() {
        return Err(TransitionError::Unauthorized(
            "only the reporter may cancel this meeting".to_string(),
        ));
    }
    if !meeting.status.is_active() {
        return Err(TransitionError::InvalidState {
            action: "cancel",
            status: meeting.status,
        });
    }

    set_status(pool, meeting_id, MeetingStatus::Cancelled).await?;
    let meeting = load(pool, meeting_id).await?;

    if let Some(event_id) = meeting.calendar_event_id.clone() {
        best_effort("calendar", effects.calendar.delete_event(&event_id)).await;
    }
    effects
        .notify_user(
            &meeting.employee_id,
            "meeting_cancelled",
            "Your one-on-one was cancelled",
            Some(&meeting.id),
        )
        .await;

    Ok(meeting)
}

/// Reporter/admin edit of date and/or status.
///
/// Status is limited to SCHEDULED, COMPLETED and CANCELLED; the usual guards
/// apply (COMPLETED only from SCHEDULED, CANCELLED only from an active
/// status, SCHEDULED from PROPOSED acts as a direct acceptance).
pub async fn update(
    pool: &SqlitePool,
    effects: &Effects,
    caller: &User,
    meeting_id: &str,
    new_date: Option<DateTime<Utc>>,
    new_status: Option<MeetingStatus>,
) -> Result<Meeting> {
    let meeting = load(pool, meeting_id).await?;

    if meeting.reporter_id != caller.id && !caller.role.is_admin() {
        return Err(TransitionError::Unauthorized(
            "only the reporter may edit this meeting".to_string(),
        ));
    }

    if let Some(date) = new_date {
        if !meeting.status.is_active() {
            return Err(TransitionError::InvalidState {
                action: "reschedule",
                status: meeting.status,
            });
        }
        sqlx::query("UPDATE meetings SET meeting_date = ?, updated_at = ? WHERE id = ?")
            .bind(date)
            .bind(Utc::now())
            .bind(meeting_id)
            .execute(pool)
            .await?;
    }

    if let Some(status) = new_status {
        match status {
            MeetingStatus::Scheduled => {
                let current = load(pool, meeting_id).await?;
                if !current.status.is_active() {
                    return Err(TransitionError::InvalidState {
                        action: "schedule",
                        status: current.status,
                    });
                }
                if current.status == MeetingStatus::Proposed {
                    set_status(pool, meeting_id, MeetingStatus::Scheduled).await?;
                    let scheduled = load(pool, meeting_id).await?;
                    match effects.calendar.create_event(&scheduled).await {
                        Ok(event_id) if !event_id.is_empty() => {
                            sqlx::query(
                                "UPDATE meetings SET calendar_event_id = ? WHERE id = ?",
                            )
                            .bind(&event_id)
                            .bind(meeting_id)
                            .execute(pool)
                            .await?;
                        }
                        Ok(_) => {}
                        Err(e) => warn!("calendar side effect failed: {}", e),
                    }
                }
            }
            MeetingStatus::Completed => {
                return complete(pool, effects, caller, meeting_id).await;
            }
            MeetingStatus::Cancelled => {
                return cancel(pool, effects, caller, meeting_id).await;
            }
            MeetingStatus::Proposed => {
                return Err(TransitionError::Validation(
                    "status may only be set to SCHEDULED, COMPLETED or CANCELLED".to_string(),
                ));
            }
        }
    }

    let meeting = load(pool, meeting_id).await?;
    effects
        .notify_user(
            &meeting.employee_id,
            "meeting_updated",
            "Your one-on-one meeting was updated",
            Some(&meeting.id),
        )
        .await;
    Ok(meeting)
}

/// Admin-only hard delete. The linked calendar event is removed first.
pub async fn delete(
    pool: &SqlitePool,
    effects: &Effects,
    caller: &User,
    meeting_id: &str,
) -> Result<()> {
    if !caller.role.is_admin() {
        return Err(TransitionError::Unauthorized(
            "only an admin may delete a meeting".to_string(),
        ));
    }
    let meeting = load(pool, meeting_id).await?;

    if let Some(event_id) = meeting.calendar_event_id.clone() {
        best_effort("calendar", effects.calendar.delete_event(&event_id)).await;
    }

    sqlx::query("DELETE FROM meetings WHERE id = ?")
        .bind(meeting_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Employee writes the one-on-one form.
///
/// The first submission is always allowed; after the meeting time has passed
/// and a submission exists, the form is frozen. Independent of status; it
/// never moves a meeting to COMPLETED.
pub async fn submit_form(
    pool: &SqlitePool,
    caller: &User,
    meeting_id: &str,
    fields: FormFields,
) -> Result<Meeting> {
    let meeting = load(pool, meeting_id).await?;

    if meeting.employee_id != caller.id {
        return Err(TransitionError::Unauthorized(
            "only the employee may fill in the meeting form".to_string(),
        ));
    }

    let now = Utc::now();
    if meeting.meeting_date < now && meeting.form_submitted_at.is_some() {
        return Err(TransitionError::Unauthorized(
            "the form is frozen once the meeting has passed".to_string(),
        ));
    }

    let submitted_at = meeting.form_submitted_at.unwrap_or(now);
    sqlx::query(
        r#"
        UPDATE meetings
        SET check_in = ?, goals = ?, progress = ?, challenges = ?, notes = ?,
            form_submitted_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.check_in)
    .bind(&fields.goals)
    .bind(&fields.progress)
    .bind(&fields.challenges)
    .bind(&fields.notes)
    .bind(submitted_at)
    .bind(now)
    .bind(meeting_id)
    .execute(pool)
    .await?;

    load(pool, meeting_id).await
}

async fn set_status(
    pool: &SqlitePool,
    meeting_id: &str,
    status: MeetingStatus,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query("UPDATE meetings SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(meeting_id)
        .execute(pool)
        .await?;
    Ok(())
}

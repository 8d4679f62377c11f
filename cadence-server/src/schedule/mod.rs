//! Recurring schedule engine
//!
//! A schedule is a standing cadence between one reporter and one employee.
//! Creation spawns the first PROPOSED meeting; the regeneration sweep keeps
//! spawning meetings as `next_meeting_date` comes due. Schedules are never
//! hard-deleted, deactivation flips `is_active` so meeting history keeps a
//! valid foreign key.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use cadence_common::access::can_access;
use cadence_common::db::models::{Frequency, Meeting, RecurringSchedule, User};
use cadence_common::occurrence::{next_occurrence, parse_time_of_day};

use crate::effects::Effects;
use crate::meetings::{self, TransitionError};

type Result<T> = std::result::Result<T, TransitionError>;

pub async fn find_schedule(
    pool: &SqlitePool,
    id: &str,
) -> std::result::Result<Option<RecurringSchedule>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM recurring_schedules WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref()
        .map(|r| {
            RecurringSchedule::from_row(r).map_err(|e| sqlx::Error::Decode(e.to_string().into()))
        })
        .transpose()
}

async fn load(pool: &SqlitePool, id: &str) -> Result<RecurringSchedule> {
    find_schedule(pool, id).await?.ok_or(TransitionError::NotFound)
}

/// Create a schedule and its first PROPOSED meeting in one transaction.
///
/// Three uniqueness guards run as pre-condition checks against the existing
/// active schedules before the insert; sharing the transaction with the
/// insert keeps concurrent creations from slipping past each other.
pub async fn create_schedule(
    pool: &SqlitePool,
    effects: &Effects,
    caller: &User,
    employee_id: &str,
    frequency: Frequency,
    day_of_week: i64,
    time_of_day: &str,
) -> Result<RecurringSchedule> {
    if !(0..=6).contains(&day_of_week) {
        return Err(TransitionError::Validation(
            "day_of_week must be 0 (Sunday) through 6 (Saturday)".to_string(),
        ));
    }
    parse_time_of_day(time_of_day)?;

    let employee = sqlx::query("SELECT * FROM users WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool)
        .await?
        .as_ref()
        .map(User::from_row)
        .transpose()?
        .ok_or(TransitionError::NotFound)?;

    if employee.id == caller.id {
        return Err(TransitionError::Validation(
            "cannot set up a recurring one-on-one with yourself".to_string(),
        ));
    }
    if !can_access(caller.role, &caller.id, &employee.id, employee.manager_id.as_deref()) {
        return Err(TransitionError::Unauthorized(
            "only the employee's manager or an admin may create this schedule".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    // Guard 1: one active schedule per (reporter, employee) pair
    let pair: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM recurring_schedules
         WHERE reporter_id = ? AND employee_id = ? AND is_active = 1",
    )
    .bind(&caller.id)
    .bind(&employee.id)
    .fetch_one(&mut *tx)
    .await?;
    if pair > 0 {
        return Err(TransitionError::Validation(format!(
            "an active recurring schedule with {} already exists",
            employee.name
        )));
    }

    // Guard 2: the reporter's weekly slot is free
    let reporter_slot: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM recurring_schedules
         WHERE reporter_id = ? AND day_of_week = ? AND time_of_day = ? AND is_active = 1",
    )
    .bind(&caller.id)
    .bind(day_of_week)
    .bind(time_of_day)
    .fetch_one(&mut *tx)
    .await?;
    if reporter_slot > 0 {
        return Err(TransitionError::Validation(format!(
            "you already have an active recurring schedule at {} on that day",
            time_of_day
        )));
    }

    // Guard 3: the employee's weekly slot is free
    let employee_slot: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM recurring_schedules
         WHERE employee_id = ? AND day_of_week = ? AND time_of_day = ? AND is_active = 1",
    )
    .bind(&employee.id)
    .bind(day_of_week)
    .bind(time_of_day)
    .fetch_one(&mut *tx)
    .await?;
    if employee_slot > 0 {
        return Err(TransitionError::Validation(format!(
            "{} already has an active recurring schedule at {} on that day",
            employee.name, time_of_day
        )));
    }

    let now = Utc::now();
    let first_date = next_occurrence(day_of_week, time_of_day, frequency, now)?;
    let schedule_id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO recurring_schedules
            (id, reporter_id, employee_id, frequency, day_of_week, time_of_day,
             next_meeting_date, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(&schedule_id)
    .bind(&caller.id)
    .bind(&employee.id)
    .bind(frequency.as_str())
    .bind(day_of_week)
    .bind(time_of_day)
    .bind(first_date)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    // First meeting rides the same transaction as the schedule
    let meeting_id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO meetings (id, employee_id, reporter_id, meeting_date, status,
                              proposed_by_id, recurring_schedule_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'PROPOSED', ?, ?, ?, ?)
        "#,
    )
    .bind(&meeting_id)
    .bind(&employee.id)
    .bind(&caller.id)
    .bind(first_date)
    .bind(&caller.id)
    .bind(&schedule_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    effects
        .notify_user(
            &employee.id,
            "schedule_created",
            &format!("{} set up a recurring one-on-one with you", caller.name),
            Some(&meeting_id),
        )
        .await;

    load(pool, &schedule_id).await
}

/// Edit cadence fields and recompute the next occurrence.
///
/// Still-PROPOSED future meetings of the schedule move to the new date;
/// SCHEDULED meetings were agreed to and stay where they are.
pub async fn update_schedule(
    pool: &SqlitePool,
    caller: &User,
    schedule_id: &str,
    frequency: Option<Frequency>,
    day_of_week: Option<i64>,
    time_of_day: Option<&str>,
) -> Result<RecurringSchedule> {
    let schedule = load(pool, schedule_id).await?;

    if schedule.reporter_id != caller.id && !caller.role.is_admin() {
        return Err(TransitionError::Unauthorized(
            "only the schedule's reporter may edit it".to_string(),
        ));
    }
    if !schedule.is_active {
        return Err(TransitionError::Validation(
            "cannot edit a deactivated schedule".to_string(),
        ));
    }

    let frequency = frequency.unwrap_or(schedule.frequency);
    let day_of_week = day_of_week.unwrap_or(schedule.day_of_week);
    let time_of_day = time_of_day.unwrap_or(&schedule.time_of_day).to_string();

    if !(0..=6).contains(&day_of_week) {
        return Err(TransitionError::Validation(
            "day_of_week must be 0 (Sunday) through 6 (Saturday)".to_string(),
        ));
    }
    parse_time_of_day(&time_of_day)?;

    let now = Utc::now();
    let next_date = next_occurrence(day_of_week, &time_of_day, frequency, now)?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE recurring_schedules
        SET frequency = ?, day_of_week = ?, time_of_day = ?,
            next_meeting_date = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(frequency.as_str())
    .bind(day_of_week)
    .bind(&time_of_day)
    .bind(next_date)
    .bind(now)
    .bind(schedule_id)
    .execute(&mut *tx)
    .await?;

    let moved = sqlx::query(
        r#"
        UPDATE meetings
        SET meeting_date = ?, updated_at = ?
        WHERE recurring_schedule_id = ? AND status = 'PROPOSED' AND meeting_date > ?
        "#,
    )
    .bind(next_date)
    .bind(now)
    .bind(schedule_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    if moved.rows_affected() > 0 {
        info!(
            schedule_id,
            moved = moved.rows_affected(),
            "moved pending meetings to the new cadence"
        );
    }

    load(pool, schedule_id).await
}

/// Soft-delete: `is_active = false`. With `cancel_future` set, every future
/// SCHEDULED or PROPOSED meeting of the schedule goes through the state
/// machine's cancel so calendar events and notifications are handled.
pub async fn deactivate_schedule(
    pool: &SqlitePool,
    effects: &Effects,
    caller: &User,
    schedule_id: &str,
    cancel_future: bool,
) -> Result<RecurringSchedule> {
    let schedule = load(pool, schedule_id).await?;

    if schedule.reporter_id != caller.id && !caller.role.is_admin() {
        return Err(TransitionError::Unauthorized(
            "only the schedule's reporter may deactivate it".to_string(),
        ));
    }

    sqlx::query("UPDATE recurring_schedules SET is_active = 0, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(schedule_id)
        .execute(pool)
        .await?;

    if cancel_future {
        let now = Utc::now();
        let rows = sqlx::query(
            r#"
            SELECT * FROM meetings
            WHERE recurring_schedule_id = ?
              AND status IN ('PROPOSED', 'SCHEDULED')
              AND meeting_date > ?
            "#,
        )
        .bind(schedule_id)
        .bind(now)
        .fetch_all(pool)
        .await?;

        for row in &rows {
            let meeting = Meeting::from_row(row)?;
            meetings::cancel(pool, effects, caller, &meeting.id).await?;
        }
    }

    load(pool, schedule_id).await
}

/// One due schedule processed: the meeting it produced and the advanced date
#[derive(Debug)]
pub struct GeneratedMeeting {
    pub schedule_id: String,
    pub meeting_id: String,
    pub next_meeting_date: DateTime<Utc>,
}

/// Create meetings for every active schedule whose `next_meeting_date` has
/// come due, advancing each schedule past the generated occurrence.
///
/// Schedules are processed independently; an error on one is returned to the
/// caller as text and the sweep moves on.
pub async fn run_regeneration(
    pool: &SqlitePool,
    effects: &Effects,
    now: DateTime<Utc>,
) -> std::result::Result<(Vec<GeneratedMeeting>, Vec<String>), sqlx::Error> {
    let rows = sqlx::query(
        "SELECT * FROM recurring_schedules WHERE is_active = 1 AND next_meeting_date <= ?",
    )
    .bind(now)
    .fetch_all(pool)
    .await?;

    let mut generated = Vec::new();
    let mut errors = Vec::new();

    for row in &rows {
        let schedule = match RecurringSchedule::from_row(row) {
            Ok(s) => s,
            Err(e) => {
                errors.push(format!("unreadable schedule row: {}", e));
                continue;
            }
        };
        match generate_for_schedule(pool, effects, &schedule, now).await {
            Ok(item) => generated.push(item),
            Err(e) => errors.push(format!("schedule {}: {}", schedule.id, e)),
        }
    }

    Ok((generated, errors))
}

async fn generate_for_schedule(
    pool: &SqlitePool,
    effects: &Effects,
    schedule: &RecurringSchedule,
    now: DateTime<Utc>,
) -> Result<GeneratedMeeting> {
    let following = next_occurrence(
        schedule.day_of_week,
        &schedule.time_of_day,
        schedule.frequency,
        now.max(schedule.next_meeting_date),
    )?;

    let meeting_id = Uuid::new_v4().to_string();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO meetings (id, employee_id, reporter_id, meeting_date, status,
                              proposed_by_id, recurring_schedule_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'PROPOSED', ?, ?, ?, ?)
        "#,
    )
    .bind(&meeting_id)
    .bind(&schedule.employee_id)
    .bind(&schedule.reporter_id)
    .bind(schedule.next_meeting_date)
    .bind(&schedule.reporter_id)
    .bind(&schedule.id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE recurring_schedules
        SET next_meeting_date = ?, last_generated_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(following)
    .bind(now)
    .bind(now)
    .bind(&schedule.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    effects
        .notify_user(
            &schedule.employee_id,
            "meeting_proposed",
            "Your recurring one-on-one was scheduled, please confirm the time",
            Some(&meeting_id),
        )
        .await;

    Ok(GeneratedMeeting {
        schedule_id: schedule.id.clone(),
        meeting_id,
        next_meeting_date: following,
    })
}

//! Double-booking detection
//!
//! A candidate time conflicts when any other PROPOSED or SCHEDULED meeting
//! lies inside the symmetric ±29 minute window and involves either party as
//! employee or reporter. Two meetings exactly 30 minutes apart do not
//! conflict. This is a deliberately coarse window check; free/busy reasoning
//! belongs to the calendar collaborator and is never used for rejection.

use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Half-width of the conflict window
const WINDOW_MINUTES: i64 = 29;

/// The meeting that blocks a candidate slot, with participant names for the
/// user-facing message
#[derive(Debug, Clone)]
pub struct ConflictingMeeting {
    pub meeting_id: String,
    pub meeting_date: DateTime<Utc>,
    pub employee_id: String,
    pub reporter_id: String,
    pub employee_name: String,
    pub reporter_name: String,
}

impl ConflictingMeeting {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            meeting_id: row.try_get("id")?,
            meeting_date: row.try_get("meeting_date")?,
            employee_id: row.try_get("employee_id")?,
            reporter_id: row.try_get("reporter_id")?,
            employee_name: row.try_get("employee_name")?,
            reporter_name: row.try_get("reporter_name")?,
        })
    }

    /// Human-readable description naming which of the two candidate parties
    /// is busy, and with whom
    pub fn describe(&self, party_a: &str, party_b: &str) -> String {
        let (busy_name, other_name) =
            if self.employee_id == party_a || self.employee_id == party_b {
                (&self.employee_name, &self.reporter_name)
            } else {
                (&self.reporter_name, &self.employee_name)
            };
        format!(
            "{} already has a meeting with {} within 30 minutes of that time",
            busy_name, other_name
        )
    }
}

/// Find the first active meeting colliding with `candidate` for either party.
///
/// `exclude_meeting` skips the meeting being rescheduled so it cannot
/// conflict with itself.
pub async fn find_conflict<'e, E>(
    executor: E,
    candidate: DateTime<Utc>,
    party_a: &str,
    party_b: &str,
    exclude_meeting: Option<&str>,
) -> Result<Option<ConflictingMeeting>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let window_start = candidate - Duration::minutes(WINDOW_MINUTES);
    let window_end = candidate + Duration::minutes(WINDOW_MINUTES);

    let row = sqlx::query(
        r#"
        SELECT m.id, m.meeting_date, m.employee_id, m.reporter_id,
               e.name AS employee_name, r.name AS reporter_name
        FROM meetings m
        JOIN users e ON e.id = m.employee_id
        JOIN users r ON r.id = m.reporter_id
        WHERE m.status IN ('PROPOSED', 'SCHEDULED')
          AND m.meeting_date BETWEEN ? AND ?
          AND (m.employee_id IN (?, ?) OR m.reporter_id IN (?, ?))
          AND (? IS NULL OR m.id <> ?)
        LIMIT 1
        "#,
    )
    .bind(window_start)
    .bind(window_end)
    .bind(party_a)
    .bind(party_b)
    .bind(party_a)
    .bind(party_b)
    .bind(exclude_meeting)
    .bind(exclude_meeting)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(ConflictingMeeting::from_row).transpose()
}

//! Database models
//!
//! Rows are stored with TEXT ids (UUIDv4) and RFC 3339 UTC instants, and are
//! mapped by hand from `sqlx` rows; enum columns are plain TEXT constrained by
//! CHECK clauses in the schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// User role, ordered roughly by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Employee,
    Manager,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "EMPLOYEE",
            Role::Manager => "MANAGER",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// ADMIN and SUPER_ADMIN both clear the admin gate
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "EMPLOYEE" => Ok(Role::Employee),
            "MANAGER" => Ok(Role::Manager),
            "ADMIN" => Ok(Role::Admin),
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            other => Err(Error::InvalidInput(format!("unknown role: {}", other))),
        }
    }
}

/// Meeting lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeetingStatus {
    Proposed,
    Scheduled,
    Completed,
    Cancelled,
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Proposed => "PROPOSED",
            MeetingStatus::Scheduled => "SCHEDULED",
            MeetingStatus::Completed => "COMPLETED",
            MeetingStatus::Cancelled => "CANCELLED",
        }
    }

    /// PROPOSED and SCHEDULED count toward conflict detection
    pub fn is_active(&self) -> bool {
        matches!(self, MeetingStatus::Proposed | MeetingStatus::Scheduled)
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeetingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PROPOSED" => Ok(MeetingStatus::Proposed),
            "SCHEDULED" => Ok(MeetingStatus::Scheduled),
            "COMPLETED" => Ok(MeetingStatus::Completed),
            "CANCELLED" => Ok(MeetingStatus::Cancelled),
            other => Err(Error::InvalidInput(format!(
                "unknown meeting status: {}",
                other
            ))),
        }
    }
}

/// Recurring schedule cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "WEEKLY",
            Frequency::Biweekly => "BIWEEKLY",
            Frequency::Monthly => "MONTHLY",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "WEEKLY" => Ok(Frequency::Weekly),
            "BIWEEKLY" => Ok(Frequency::Biweekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            other => Err(Error::InvalidInput(format!(
                "unknown frequency: {}",
                other
            ))),
        }
    }
}

/// Recording pipeline status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingStatus {
    Uploaded,
    Transcribing,
    Analyzing,
    Completed,
    Failed,
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingStatus::Uploaded => "UPLOADED",
            RecordingStatus::Transcribing => "TRANSCRIBING",
            RecordingStatus::Analyzing => "ANALYZING",
            RecordingStatus::Completed => "COMPLETED",
            RecordingStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "UPLOADED" => Ok(RecordingStatus::Uploaded),
            "TRANSCRIBING" => Ok(RecordingStatus::Transcribing),
            "ANALYZING" => Ok(RecordingStatus::Analyzing),
            "COMPLETED" => Ok(RecordingStatus::Completed),
            "FAILED" => Ok(RecordingStatus::Failed),
            other => Err(Error::InvalidInput(format!(
                "unknown recording status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub manager_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            role: row.try_get::<String, _>("role")?.parse()?,
            manager_id: row.try_get("manager_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// One scheduled or proposed one-on-one session between an employee and a
/// reporter (their manager).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: String,
    pub employee_id: String,
    pub reporter_id: String,
    pub meeting_date: DateTime<Utc>,
    pub status: MeetingStatus,
    /// Which of the two participants currently owns the pending proposal.
    /// Only meaningful while status = PROPOSED.
    pub proposed_by_id: Option<String>,
    pub recurring_schedule_id: Option<String>,
    pub check_in: Option<String>,
    pub goals: Option<String>,
    pub progress: Option<String>,
    pub challenges: Option<String>,
    pub notes: Option<String>,
    pub form_submitted_at: Option<DateTime<Utc>>,
    pub reminder_24h_sent: bool,
    pub reminder_1h_sent: bool,
    pub calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            employee_id: row.try_get("employee_id")?,
            reporter_id: row.try_get("reporter_id")?,
            meeting_date: row.try_get("meeting_date")?,
            status: row.try_get::<String, _>("status")?.parse()?,
            proposed_by_id: row.try_get("proposed_by_id")?,
            recurring_schedule_id: row.try_get("recurring_schedule_id")?,
            check_in: row.try_get("check_in")?,
            goals: row.try_get("goals")?,
            progress: row.try_get("progress")?,
            challenges: row.try_get("challenges")?,
            notes: row.try_get("notes")?,
            form_submitted_at: row.try_get("form_submitted_at")?,
            reminder_24h_sent: row.try_get::<i64, _>("reminder_24h_sent")? != 0,
            reminder_1h_sent: row.try_get::<i64, _>("reminder_1h_sent")? != 0,
            calendar_event_id: row.try_get("calendar_event_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// The participant expected to accept or counter-suggest the current
    /// proposal (the non-proposer). `None` outside of PROPOSED.
    pub fn receiver_id(&self) -> Option<&str> {
        match (self.status, self.proposed_by_id.as_deref()) {
            (MeetingStatus::Proposed, Some(p)) if p == self.employee_id => {
                Some(self.reporter_id.as_str())
            }
            (MeetingStatus::Proposed, Some(_)) => Some(self.employee_id.as_str()),
            _ => None,
        }
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.employee_id == user_id || self.reporter_id == user_id
    }
}

/// A standing cadence between one reporter and one employee
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringSchedule {
    pub id: String,
    pub reporter_id: String,
    pub employee_id: String,
    pub frequency: Frequency,
    /// 0 = Sunday through 6 = Saturday
    pub day_of_week: i64,
    /// "HH:MM", 24h clock
    pub time_of_day: String,
    pub next_meeting_date: DateTime<Utc>,
    pub is_active: bool,
    pub last_generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringSchedule {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            reporter_id: row.try_get("reporter_id")?,
            employee_id: row.try_get("employee_id")?,
            frequency: row.try_get::<String, _>("frequency")?.parse()?,
            day_of_week: row.try_get("day_of_week")?,
            time_of_day: row.try_get("time_of_day")?,
            next_meeting_date: row.try_get("next_meeting_date")?,
            is_active: row.try_get::<i64, _>("is_active")? != 0,
            last_generated_at: row.try_get("last_generated_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// An audio recording attached to a meeting, progressed by the background
/// transcription pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: String,
    pub meeting_id: String,
    pub file_path: String,
    pub status: RecordingStatus,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recording {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            meeting_id: row.try_get("meeting_id")?,
            file_path: row.try_get("file_path")?,
            status: row.try_get::<String, _>("status")?.parse()?,
            transcript: row.try_get("transcript")?,
            summary: row.try_get("summary")?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// In-app notification row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub message: String,
    pub meeting_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            kind: row.try_get("kind")?,
            message: row.try_get("message")?,
            meeting_id: row.try_get("meeting_id")?,
            is_read: row.try_get::<i64, _>("is_read")? != 0,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in ["PROPOSED", "SCHEDULED", "COMPLETED", "CANCELLED"] {
            let parsed: MeetingStatus = s.parse().unwrap();
            assert_eq!(parsed.as_str(), s);
        }
        assert!("DRAFT".parse::<MeetingStatus>().is_err());
    }

    #[test]
    fn receiver_is_the_non_proposer() {
        let now = Utc::now();
        let mut meeting = Meeting {
            id: "m1".into(),
            employee_id: "e1".into(),
            reporter_id: "r1".into(),
            meeting_date: now,
            status: MeetingStatus::Proposed,
            proposed_by_id: Some("r1".into()),
            recurring_schedule_id: None,
            check_in: None,
            goals: None,
            progress: None,
            challenges: None,
            notes: None,
            form_submitted_at: None,
            reminder_24h_sent: false,
            reminder_1h_sent: false,
            calendar_event_id: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(meeting.receiver_id(), Some("e1"));

        meeting.proposed_by_id = Some("e1".into());
        assert_eq!(meeting.receiver_id(), Some("r1"));

        meeting.status = MeetingStatus::Scheduled;
        assert_eq!(meeting.receiver_id(), None);
    }
}

//! Side-effect ports
//!
//! Calendar, email, notification and transcription are external collaborators
//! behind trait objects so handlers and tests can swap implementations. All
//! ports are best-effort: a failed side effect is logged and never rolls back
//! or fails the state transition that triggered it.

pub mod http;
pub mod notify;

use async_trait::async_trait;
use cadence_common::db::models::Meeting;
use cadence_common::Result;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

/// Calendar collaborator: event lifecycle tied to SCHEDULED meetings
#[async_trait]
pub trait CalendarPort: Send + Sync {
    /// Create an event for a scheduled meeting, returning the provider's
    /// event id
    async fn create_event(&self, meeting: &Meeting) -> Result<String>;

    async fn delete_event(&self, event_id: &str) -> Result<()>;
}

/// Email collaborator
#[async_trait]
pub trait EmailPort: Send + Sync {
    async fn send(&self, to_user_id: &str, subject: &str, body: &str) -> Result<()>;
}

/// In-app notification collaborator
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn notify(
        &self,
        user_id: &str,
        kind: &str,
        message: &str,
        meeting_id: Option<&str>,
    ) -> Result<()>;
}

/// Audio transcription/analysis collaborator
#[async_trait]
pub trait TranscriberPort: Send + Sync {
    async fn transcribe(&self, file_path: &str) -> Result<String>;

    async fn summarize(&self, transcript: &str) -> Result<String>;
}

/// Bundle of all ports, injected into handlers via AppState
#[derive(Clone)]
pub struct Effects {
    pub calendar: Arc<dyn CalendarPort>,
    pub email: Arc<dyn EmailPort>,
    pub notifier: Arc<dyn NotificationPort>,
    pub transcriber: Arc<dyn TranscriberPort>,
}

impl Effects {
    /// Notify a user in-app and by email about a meeting, best-effort
    pub async fn notify_user(
        &self,
        user_id: &str,
        kind: &str,
        message: &str,
        meeting_id: Option<&str>,
    ) {
        best_effort(
            "notification",
            self.notifier.notify(user_id, kind, message, meeting_id),
        )
        .await;
        best_effort("email", self.email.send(user_id, kind, message)).await;
    }
}

/// Run a side effect, logging failure and continuing
pub async fn best_effort<F>(what: &str, fut: F)
where
    F: Future<Output = Result<()>>,
{
    if let Err(e) = fut.await {
        warn!("{} side effect failed: {}", what, e);
    }
}

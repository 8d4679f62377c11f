//! HTTP-backed port implementations
//!
//! Each collaborator is reached through a small JSON-over-HTTP client. A port
//! constructed with an empty base URL is disabled: calls succeed as logged
//! no-ops, so a deployment without (say) a calendar service keeps working.

use async_trait::async_trait;
use cadence_common::db::models::Meeting;
use cadence_common::{Error, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{CalendarPort, EmailPort, TranscriberPort};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

fn network_err(e: reqwest::Error) -> Error {
    Error::Internal(format!("network error: {}", e))
}

fn api_err(status: reqwest::StatusCode) -> Error {
    Error::Internal(format!("collaborator returned {}", status))
}

/// Calendar service client
pub struct HttpCalendar {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCalendar {
    pub fn new(base_url: String) -> Self {
        Self {
            client: build_client(),
            base_url,
        }
    }
}

#[derive(Deserialize)]
struct EventResponse {
    id: String,
}

#[async_trait]
impl CalendarPort for HttpCalendar {
    async fn create_event(&self, meeting: &Meeting) -> Result<String> {
        if self.base_url.is_empty() {
            debug!("calendar port disabled, skipping create_event");
            return Ok(String::new());
        }
        let resp = self
            .client
            .post(format!("{}/events", self.base_url))
            .json(&json!({
                "title": "One-on-one",
                "start": meeting.meeting_date,
                "attendees": [meeting.employee_id, meeting.reporter_id],
                "meetingId": meeting.id,
            }))
            .send()
            .await
            .map_err(network_err)?;
        if !resp.status().is_success() {
            return Err(api_err(resp.status()));
        }
        let event: EventResponse = resp.json().await.map_err(network_err)?;
        Ok(event.id)
    }

    async fn delete_event(&self, event_id: &str) -> Result<()> {
        if self.base_url.is_empty() || event_id.is_empty() {
            return Ok(());
        }
        let resp = self
            .client
            .delete(format!("{}/events/{}", self.base_url, event_id))
            .send()
            .await
            .map_err(network_err)?;
        // Deleting an already-gone event is fine
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(api_err(resp.status()));
        }
        Ok(())
    }
}

/// Email service client
pub struct HttpEmail {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEmail {
    pub fn new(base_url: String) -> Self {
        Self {
            client: build_client(),
            base_url,
        }
    }
}

#[async_trait]
impl EmailPort for HttpEmail {
    async fn send(&self, to_user_id: &str, subject: &str, body: &str) -> Result<()> {
        if self.base_url.is_empty() {
            debug!("email port disabled, skipping send");
            return Ok(());
        }
        let resp = self
            .client
            .post(format!("{}/send", self.base_url))
            .json(&json!({
                "userId": to_user_id,
                "subject": subject,
                "body": body,
            }))
            .send()
            .await
            .map_err(network_err)?;
        if !resp.status().is_success() {
            return Err(api_err(resp.status()));
        }
        Ok(())
    }
}

/// Transcription service client
pub struct HttpTranscriber {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTranscriber {
    pub fn new(base_url: String) -> Self {
        Self {
            client: build_client(),
            base_url,
        }
    }
}

#[derive(Deserialize)]
struct TranscriptResponse {
    text: String,
}

#[async_trait]
impl TranscriberPort for HttpTranscriber {
    async fn transcribe(&self, file_path: &str) -> Result<String> {
        if self.base_url.is_empty() {
            return Err(Error::Config("transcriber_base_url is not set".to_string()));
        }
        let resp = self
            .client
            .post(format!("{}/transcribe", self.base_url))
            .json(&json!({ "filePath": file_path }))
            .send()
            .await
            .map_err(network_err)?;
        if !resp.status().is_success() {
            return Err(api_err(resp.status()));
        }
        let out: TranscriptResponse = resp.json().await.map_err(network_err)?;
        Ok(out.text)
    }

    async fn summarize(&self, transcript: &str) -> Result<String> {
        if self.base_url.is_empty() {
            return Err(Error::Config("transcriber_base_url is not set".to_string()));
        }
        let resp = self
            .client
            .post(format!("{}/summarize", self.base_url))
            .json(&json!({ "transcript": transcript }))
            .send()
            .await
            .map_err(network_err)?;
        if !resp.status().is_success() {
            return Err(api_err(resp.status()));
        }
        let out: TranscriptResponse = resp.json().await.map_err(network_err)?;
        Ok(out.text)
    }
}

//! In-memory test server
//!
//! Builds the real router over an in-memory SQLite database with counting
//! stub ports in place of the HTTP-backed collaborators. Notifications go
//! through the real DbNotifier so tests can assert on the table.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::ServiceExt;

use cadence_common::db::create_schema;
use cadence_common::db::models::Meeting;
use cadence_common::Result;

use cadence_server::effects::notify::DbNotifier;
use cadence_server::effects::{CalendarPort, Effects, EmailPort, TranscriberPort};
use cadence_server::{build_router, AppState};

/// Calendar stub counting create/delete calls
pub struct CountingCalendar {
    pub creates: Arc<AtomicUsize>,
    pub deletes: Arc<AtomicUsize>,
}

#[async_trait]
impl CalendarPort for CountingCalendar {
    async fn create_event(&self, _meeting: &Meeting) -> Result<String> {
        let n = self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(format!("evt-{}", n))
    }

    async fn delete_event(&self, _event_id: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Email stub counting sends
pub struct CountingEmail {
    pub sends: Arc<AtomicUsize>,
}

#[async_trait]
impl EmailPort for CountingEmail {
    async fn send(&self, _to_user_id: &str, _subject: &str, _body: &str) -> Result<()> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Transcriber stub returning canned text, optionally failing
pub struct StubTranscriber {
    pub fail: bool,
}

#[async_trait]
impl TranscriberPort for StubTranscriber {
    async fn transcribe(&self, _file_path: &str) -> Result<String> {
        if self.fail {
            return Err(cadence_common::Error::Internal(
                "transcriber unavailable".to_string(),
            ));
        }
        Ok("full transcript".to_string())
    }

    async fn summarize(&self, _transcript: &str) -> Result<String> {
        if self.fail {
            return Err(cadence_common::Error::Internal(
                "transcriber unavailable".to_string(),
            ));
        }
        Ok("summary".to_string())
    }
}

pub struct TestApp {
    pub pool: SqlitePool,
    pub router: Router,
    pub calendar_creates: Arc<AtomicUsize>,
    pub calendar_deletes: Arc<AtomicUsize>,
    pub email_sends: Arc<AtomicUsize>,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(false).await
}

pub async fn spawn_app_with(transcriber_fails: bool) -> TestApp {
    // Single connection: each :memory: connection is its own database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();

    let calendar_creates = Arc::new(AtomicUsize::new(0));
    let calendar_deletes = Arc::new(AtomicUsize::new(0));
    let email_sends = Arc::new(AtomicUsize::new(0));

    let effects = Effects {
        calendar: Arc::new(CountingCalendar {
            creates: calendar_creates.clone(),
            deletes: calendar_deletes.clone(),
        }),
        email: Arc::new(CountingEmail {
            sends: email_sends.clone(),
        }),
        notifier: Arc::new(DbNotifier::new(pool.clone())),
        transcriber: Arc::new(StubTranscriber {
            fail: transcriber_fails,
        }),
    };

    let router = build_router(AppState {
        db: pool.clone(),
        effects,
    });

    TestApp {
        pool,
        router,
        calendar_creates,
        calendar_deletes,
        email_sends,
    }
}

pub async fn seed_user(pool: &SqlitePool, id: &str, name: &str, role: &str, manager_id: Option<&str>) {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (id, name, email, role, manager_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(format!("{}@example.com", id))
    .bind(role)
    .bind(manager_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
}

/// Send a request through the router and decode the JSON body
pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    user_id: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id);
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

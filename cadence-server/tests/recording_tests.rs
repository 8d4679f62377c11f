//! Recording pipeline integration tests
//!
//! The pipeline runs detached, so these tests poll the GET endpoint until
//! the recording reaches a terminal status.

mod helpers;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use helpers::test_server::{seed_user, send, spawn_app, spawn_app_with, TestApp};

async fn seed_scheduled_meeting(app: &TestApp) -> String {
    seed_user(&app.pool, "mgr", "Morgan Manager", "MANAGER", None).await;
    seed_user(&app.pool, "emp", "Evan Employee", "EMPLOYEE", Some("mgr")).await;
    seed_user(&app.pool, "outsider", "Oana Outside", "EMPLOYEE", None).await;

    let now = Utc::now();
    sqlx::query(
        "INSERT INTO meetings (id, employee_id, reporter_id, meeting_date, status,
                               created_at, updated_at)
         VALUES ('m-rec', 'emp', 'mgr', ?, 'SCHEDULED', ?, ?)",
    )
    .bind(now + Duration::hours(1))
    .bind(now)
    .bind(now)
    .execute(&app.pool)
    .await
    .unwrap();
    "m-rec".to_string()
}

async fn poll_until_terminal(app: &TestApp, recording_id: &str) -> Value {
    for _ in 0..50 {
        let (status, body) = send(
            &app.router,
            "GET",
            &format!("/api/recordings/{}", recording_id),
            Some("mgr"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        match body["status"].as_str() {
            Some("COMPLETED") | Some("FAILED") => return body,
            _ => tokio::time::sleep(std::time::Duration::from_millis(20)).await,
        }
    }
    panic!("recording never reached a terminal status");
}

#[tokio::test]
async fn upload_returns_immediately_and_the_pipeline_completes() {
    let app = spawn_app().await;
    let meeting_id = seed_scheduled_meeting(&app).await;

    let (status, recording) = send(
        &app.router,
        "POST",
        &format!("/api/meetings/{}/recordings", meeting_id),
        Some("mgr"),
        Some(json!({"filePath": "/drive/meetings/m-rec.ogg"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(recording["status"], "UPLOADED");

    let done = poll_until_terminal(&app, recording["id"].as_str().unwrap()).await;
    assert_eq!(done["status"], "COMPLETED");
    assert_eq!(done["transcript"], "full transcript");
    assert_eq!(done["summary"], "summary");
}

#[tokio::test]
async fn a_transcriber_failure_lands_in_failed_with_a_message() {
    let app = spawn_app_with(true).await;
    let meeting_id = seed_scheduled_meeting(&app).await;

    let (status, recording) = send(
        &app.router,
        "POST",
        &format!("/api/meetings/{}/recordings", meeting_id),
        Some("mgr"),
        Some(json!({"filePath": "/drive/meetings/m-rec.ogg"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let done = poll_until_terminal(&app, recording["id"].as_str().unwrap()).await;
    assert_eq!(done["status"], "FAILED");
    assert!(done["errorMessage"]
        .as_str()
        .unwrap()
        .contains("transcriber unavailable"));
}

#[tokio::test]
async fn only_participants_may_upload_or_read_recordings() {
    let app = spawn_app().await;
    let meeting_id = seed_scheduled_meeting(&app).await;

    let (status, _) = send(
        &app.router,
        "POST",
        &format!("/api/meetings/{}/recordings", meeting_id),
        Some("outsider"),
        Some(json!({"filePath": "/drive/x.ogg"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, recording) = send(
        &app.router,
        "POST",
        &format!("/api/meetings/{}/recordings", meeting_id),
        Some("emp"),
        Some(json!({"filePath": "/drive/x.ogg"})),
    )
    .await;
    let recording_id = recording["id"].as_str().unwrap();

    let (status, _) = send(
        &app.router,
        "GET",
        &format!("/api/recordings/{}", recording_id),
        Some("outsider"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn an_empty_file_path_is_rejected() {
    let app = spawn_app().await;
    let meeting_id = seed_scheduled_meeting(&app).await;

    let (status, _) = send(
        &app.router,
        "POST",
        &format!("/api/meetings/{}/recordings", meeting_id),
        Some("mgr"),
        Some(json!({"filePath": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

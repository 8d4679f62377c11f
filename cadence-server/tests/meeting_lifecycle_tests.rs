//! Meeting lifecycle integration tests
//!
//! Exercises the full HTTP surface for the propose/suggest/accept flow,
//! conflict detection at the window boundary, and the guard matrix.

mod helpers;

use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use helpers::test_server::{seed_user, send, spawn_app};

async fn seed_manager_and_report(app: &helpers::test_server::TestApp) {
    seed_user(&app.pool, "mgr", "Morgan Manager", "MANAGER", None).await;
    seed_user(&app.pool, "emp", "Evan Employee", "EMPLOYEE", Some("mgr")).await;
}

#[tokio::test]
async fn propose_creates_a_proposed_meeting_and_notifies_the_employee() {
    let app = spawn_app().await;
    seed_manager_and_report(&app).await;

    let date = (Utc::now() + Duration::days(3)).to_rfc3339();
    let (status, body) = send(
        &app.router,
        "POST",
        "/api/meetings",
        Some("mgr"),
        Some(json!({"employeeId": "emp", "meetingDate": date})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "PROPOSED");
    assert_eq!(body["proposedById"], "mgr");
    assert_eq!(body["employeeId"], "emp");

    let (status, notifications) =
        send(&app.router, "GET", "/api/notifications", Some("emp"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notifications[0]["kind"], "meeting_proposed");
}

#[tokio::test]
async fn propose_rejects_unknown_employee_with_404() {
    let app = spawn_app().await;
    seed_manager_and_report(&app).await;

    let date = (Utc::now() + Duration::days(1)).to_rfc3339();
    let (status, _) = send(
        &app.router,
        "POST",
        "/api/meetings",
        Some("mgr"),
        Some(json!({"employeeId": "nobody", "meetingDate": date})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn propose_rejects_non_manager_with_403() {
    let app = spawn_app().await;
    seed_manager_and_report(&app).await;
    seed_user(&app.pool, "other", "Olly Other", "MANAGER", None).await;
    seed_user(&app.pool, "peer", "Perry Peer", "EMPLOYEE", Some("other")).await;

    // mgr does not manage peer
    let date = (Utc::now() + Duration::days(1)).to_rfc3339();
    let (status, _) = send(
        &app.router,
        "POST",
        "/api/meetings",
        Some("mgr"),
        Some(json!({"employeeId": "peer", "meetingDate": date})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_identity_header_is_401() {
    let app = spawn_app().await;
    let (status, _) = send(&app.router, "GET", "/api/meetings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn conflict_within_29_minutes_is_409_but_30_minutes_is_fine() {
    let app = spawn_app().await;
    seed_manager_and_report(&app).await;
    seed_user(&app.pool, "emp2", "Erin Second", "EMPLOYEE", Some("mgr")).await;

    let base = Utc::now() + Duration::days(5);
    let (status, _) = send(
        &app.router,
        "POST",
        "/api/meetings",
        Some("mgr"),
        Some(json!({"employeeId": "emp", "meetingDate": base.to_rfc3339()})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // 29 minutes later: inside the window, the manager is busy
    let clash = (base + Duration::minutes(29)).to_rfc3339();
    let (status, body) = send(
        &app.router,
        "POST",
        "/api/meetings",
        Some("mgr"),
        Some(json!({"employeeId": "emp2", "meetingDate": clash})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Morgan Manager"));

    // Exactly 30 minutes apart is allowed
    let adjacent = (base + Duration::minutes(30)).to_rfc3339();
    let (status, _) = send(
        &app.router,
        "POST",
        "/api/meetings",
        Some("mgr"),
        Some(json!({"employeeId": "emp2", "meetingDate": adjacent})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn suggest_flips_the_proposer_and_accept_schedules_with_one_calendar_event() {
    let app = spawn_app().await;
    seed_manager_and_report(&app).await;

    let date = (Utc::now() + Duration::days(2)).to_rfc3339();
    let (_, meeting) = send(
        &app.router,
        "POST",
        "/api/meetings",
        Some("mgr"),
        Some(json!({"employeeId": "emp", "meetingDate": date})),
    )
    .await;
    let id = meeting["id"].as_str().unwrap().to_string();

    // The proposer cannot accept their own proposal
    let (status, _) = send(
        &app.router,
        "POST",
        &format!("/api/meetings/{}/accept", id),
        Some("mgr"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The employee counter-suggests; the proposal flips to them
    let counter = (Utc::now() + Duration::days(2) + Duration::hours(1)).to_rfc3339();
    let (status, body) = send(
        &app.router,
        "POST",
        &format!("/api/meetings/{}/suggest", id),
        Some("emp"),
        Some(json!({"meetingDate": counter})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["proposedById"], "emp");
    assert_eq!(body["status"], "PROPOSED");

    // Now the employee is the proposer; they cannot accept either
    let (status, _) = send(
        &app.router,
        "POST",
        &format!("/api/meetings/{}/accept", id),
        Some("emp"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The manager accepts; exactly one calendar event is created
    let (status, body) = send(
        &app.router,
        "POST",
        &format!("/api/meetings/{}/accept", id),
        Some("mgr"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "SCHEDULED");
    assert!(body["calendarEventId"].as_str().is_some());
    assert_eq!(app.calendar_creates.load(Ordering::SeqCst), 1);

    // Accepting again is a state error, not another calendar event
    let (status, _) = send(
        &app.router,
        "POST",
        &format!("/api/meetings/{}/accept", id),
        Some("emp"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.calendar_creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancel_deletes_the_calendar_event_and_complete_requires_scheduled() {
    let app = spawn_app().await;
    seed_manager_and_report(&app).await;

    let date = (Utc::now() + Duration::days(2)).to_rfc3339();
    let (_, meeting) = send(
        &app.router,
        "POST",
        "/api/meetings",
        Some("mgr"),
        Some(json!({"employeeId": "emp", "meetingDate": date})),
    )
    .await;
    let id = meeting["id"].as_str().unwrap().to_string();

    // COMPLETED requires SCHEDULED
    let (status, _) = send(
        &app.router,
        "PATCH",
        &format!("/api/meetings/{}", id),
        Some("mgr"),
        Some(json!({"status": "COMPLETED"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(
        &app.router,
        "POST",
        &format!("/api/meetings/{}/accept", id),
        Some("emp"),
        None,
    )
    .await;

    // The employee is not the reporter
    let (status, _) = send(
        &app.router,
        "PATCH",
        &format!("/api/meetings/{}", id),
        Some("emp"),
        Some(json!({"status": "CANCELLED"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app.router,
        "PATCH",
        &format!("/api/meetings/{}", id),
        Some("mgr"),
        Some(json!({"status": "CANCELLED"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");
    assert_eq!(app.calendar_deletes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hard_delete_is_admin_only() {
    let app = spawn_app().await;
    seed_manager_and_report(&app).await;
    seed_user(&app.pool, "root", "Ada Admin", "ADMIN", None).await;

    let date = (Utc::now() + Duration::days(2)).to_rfc3339();
    let (_, meeting) = send(
        &app.router,
        "POST",
        "/api/meetings",
        Some("mgr"),
        Some(json!({"employeeId": "emp", "meetingDate": date})),
    )
    .await;
    let id = meeting["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app.router,
        "DELETE",
        &format!("/api/meetings/{}", id),
        Some("mgr"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app.router,
        "DELETE",
        &format!("/api/meetings/{}", id),
        Some("root"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app.router,
        "GET",
        &format!("/api/meetings/{}", id),
        Some("root"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn form_submission_freezes_after_the_meeting_has_passed() {
    let app = spawn_app().await;
    seed_manager_and_report(&app).await;

    // Seed a past meeting directly so the freeze branch is reachable
    let past = Utc::now() - Duration::days(1);
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO meetings (id, employee_id, reporter_id, meeting_date, status,
                               proposed_by_id, created_at, updated_at)
         VALUES ('m-past', 'emp', 'mgr', ?, 'COMPLETED', 'mgr', ?, ?)",
    )
    .bind(past)
    .bind(now)
    .bind(now)
    .execute(&app.pool)
    .await
    .unwrap();

    // Only the employee may write the form
    let (status, _) = send(
        &app.router,
        "POST",
        "/api/meetings/m-past/form",
        Some("mgr"),
        Some(json!({"notes": "from the manager"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // First submission after the date is still allowed
    let (status, body) = send(
        &app.router,
        "POST",
        "/api/meetings/m-past/form",
        Some("emp"),
        Some(json!({"checkIn": "green", "notes": "went well"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["formSubmittedAt"].as_str().is_some());

    // A second submission is frozen out
    let (status, _) = send(
        &app.router,
        "POST",
        "/api/meetings/m-past/form",
        Some("emp"),
        Some(json!({"notes": "revised"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn list_visibility_follows_the_access_gate() {
    let app = spawn_app().await;
    seed_manager_and_report(&app).await;
    seed_user(&app.pool, "other", "Olly Other", "MANAGER", None).await;
    seed_user(&app.pool, "peer", "Perry Peer", "EMPLOYEE", Some("other")).await;
    seed_user(&app.pool, "root", "Ada Admin", "ADMIN", None).await;

    let date = (Utc::now() + Duration::days(1)).to_rfc3339();
    send(
        &app.router,
        "POST",
        "/api/meetings",
        Some("mgr"),
        Some(json!({"employeeId": "emp", "meetingDate": date})),
    )
    .await;
    let date2 = (Utc::now() + Duration::days(2)).to_rfc3339();
    send(
        &app.router,
        "POST",
        "/api/meetings",
        Some("other"),
        Some(json!({"employeeId": "peer", "meetingDate": date2})),
    )
    .await;

    let (_, mine) = send(&app.router, "GET", "/api/meetings", Some("mgr"), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (_, all) = send(&app.router, "GET", "/api/meetings", Some("root"), None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, peers) = send(&app.router, "GET", "/api/meetings", Some("emp"), None).await;
    assert_eq!(peers.as_array().unwrap().len(), 1);
}

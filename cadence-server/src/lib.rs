//! # Cadence server
//!
//! HTTP service for one-on-one meeting management: proposal/acceptance
//! lifecycle, conflict detection, recurring schedules with regeneration,
//! reminders, and the audio recording pipeline.

pub mod api;
pub mod effects;
pub mod error;
pub mod meetings;
pub mod recordings;
pub mod schedule;
pub mod sweep;

use axum::routing::{delete, get, patch, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::effects::Effects;

pub use error::{ApiError, ApiResult};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub effects: Effects,
}

/// Build the full application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health::health))

        // Meetings
        .route("/api/meetings", post(api::meetings::propose))
        .route("/api/meetings", get(api::meetings::list))
        .route("/api/meetings/:id", get(api::meetings::get))
        .route("/api/meetings/:id", patch(api::meetings::update))
        .route("/api/meetings/:id", delete(api::meetings::delete))
        .route("/api/meetings/:id/accept", post(api::meetings::accept))
        .route("/api/meetings/:id/suggest", post(api::meetings::suggest))
        .route("/api/meetings/:id/form", post(api::meetings::submit_form))

        // Recurring schedules
        .route("/api/recurring-schedules", post(api::schedules::create))
        .route("/api/recurring-schedules", get(api::schedules::list))
        .route("/api/recurring-schedules/:id", patch(api::schedules::update))
        .route("/api/recurring-schedules/:id", delete(api::schedules::deactivate))

        // Recordings
        .route("/api/meetings/:id/recordings", post(api::recordings::upload))
        .route("/api/recordings/:id", get(api::recordings::get))

        // Notifications
        .route("/api/notifications", get(api::notifications::list))
        .route("/api/notifications/:id/read", post(api::notifications::mark_read))

        // User management
        .route("/api/users", post(api::users::create))
        .route("/api/users", get(api::users::list))

        // External scheduler trigger
        .route("/api/cron/meetings", post(api::cron::run))

        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

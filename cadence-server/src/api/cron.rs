//! Cron trigger for the sweep
//!
//! Authenticated by a shared secret header rather than a user identity; the
//! caller is an external scheduler, not a person. An empty stored secret
//! disables the check for single-host setups.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use cadence_common::config::get_setting;

use crate::error::{ApiError, ApiResult};
use crate::sweep::{self, SweepReport};
use crate::AppState;

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// POST /api/cron/meetings
pub async fn run(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<SweepReport>> {
    let expected = get_setting(&state.db, "cron_shared_secret", "").await?;
    if !expected.is_empty() {
        let presented = headers
            .get(CRON_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if presented != expected {
            return Err(ApiError::Forbidden("invalid cron secret".to_string()));
        }
    }

    let report = sweep::run_sweep(&state.db, &state.effects).await?;
    Ok(Json(report))
}

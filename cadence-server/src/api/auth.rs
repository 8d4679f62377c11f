//! Caller identity
//!
//! Requests carry an `x-user-id` header set by the fronting proxy after it
//! has authenticated the session. The extractor resolves it to a full user
//! row; a missing header or unknown id is a 401 before any handler runs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use cadence_common::db::models::User;

use crate::error::ApiError;
use crate::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, resolved from `x-user-id`
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Unauthenticated("missing x-user-id header".to_string()))?;

        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&state.db)
            .await?;

        let user = row
            .as_ref()
            .map(User::from_row)
            .transpose()?
            .ok_or_else(|| ApiError::Unauthenticated("unknown user".to_string()))?;

        Ok(CurrentUser(user))
    }
}

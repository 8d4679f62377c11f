//! Table-backed notification port
//!
//! In-app notifications land as rows in the `notifications` table; clients
//! fetch them via `GET /api/notifications`.

use async_trait::async_trait;
use cadence_common::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::NotificationPort;

pub struct DbNotifier {
    pool: SqlitePool,
}

impl DbNotifier {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationPort for DbNotifier {
    async fn notify(
        &self,
        user_id: &str,
        kind: &str,
        message: &str,
        meeting_id: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, message, meeting_id, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(kind)
        .bind(message)
        .bind(meeting_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

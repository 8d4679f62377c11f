//! Database initialization
//!
//! Creates the database on first run and brings the schema up idempotently;
//! every `CREATE TABLE` uses `IF NOT EXISTS` so startup is safe to repeat.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
///
/// Exposed separately from [`init_database`] so integration tests can run the
/// exact production schema against an in-memory pool.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_settings_table(pool).await?;
    create_recurring_schedules_table(pool).await?;
    create_meetings_table(pool).await?;
    create_recordings_table(pool).await?;
    create_notifications_table(pool).await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'EMPLOYEE'
                CHECK (role IN ('EMPLOYEE', 'MANAGER', 'ADMIN', 'SUPER_ADMIN')),
            manager_id TEXT REFERENCES users(id) ON DELETE SET NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_manager ON users(manager_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_meetings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meetings (
            id TEXT PRIMARY KEY,
            employee_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            reporter_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            meeting_date TIMESTAMP NOT NULL,
            status TEXT NOT NULL DEFAULT 'PROPOSED'
                CHECK (status IN ('PROPOSED', 'SCHEDULED', 'COMPLETED', 'CANCELLED')),
            proposed_by_id TEXT,
            recurring_schedule_id TEXT REFERENCES recurring_schedules(id) ON DELETE SET NULL,
            check_in TEXT,
            goals TEXT,
            progress TEXT,
            challenges TEXT,
            notes TEXT,
            form_submitted_at TIMESTAMP,
            reminder_24h_sent INTEGER NOT NULL DEFAULT 0,
            reminder_1h_sent INTEGER NOT NULL DEFAULT 0,
            calendar_event_id TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (employee_id <> reporter_id),
            CHECK (proposed_by_id IS NULL OR proposed_by_id IN (employee_id, reporter_id))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_meetings_employee ON meetings(employee_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_meetings_reporter ON meetings(reporter_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_meetings_date ON meetings(meeting_date)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_meetings_status ON meetings(status)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_meetings_schedule ON meetings(recurring_schedule_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_recurring_schedules_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recurring_schedules (
            id TEXT PRIMARY KEY,
            reporter_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            employee_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            frequency TEXT NOT NULL
                CHECK (frequency IN ('WEEKLY', 'BIWEEKLY', 'MONTHLY')),
            day_of_week INTEGER NOT NULL CHECK (day_of_week >= 0 AND day_of_week <= 6),
            time_of_day TEXT NOT NULL,
            next_meeting_date TIMESTAMP NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            last_generated_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (employee_id <> reporter_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_schedules_reporter ON recurring_schedules(reporter_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_schedules_employee ON recurring_schedules(employee_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_schedules_due ON recurring_schedules(is_active, next_meeting_date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_recordings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recordings (
            id TEXT PRIMARY KEY,
            meeting_id TEXT NOT NULL REFERENCES meetings(id) ON DELETE CASCADE,
            file_path TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'UPLOADED'
                CHECK (status IN ('UPLOADED', 'TRANSCRIBING', 'ANALYZING', 'COMPLETED', 'FAILED')),
            transcript TEXT,
            summary TEXT,
            error_message TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_recordings_meeting ON recordings(meeting_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_notifications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            message TEXT NOT NULL,
            meeting_id TEXT REFERENCES meetings(id) ON DELETE CASCADE,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, is_read)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values, and resets NULL
/// values back to defaults.
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Sweep scheduling
    ensure_setting(pool, "sweep_interval_secs", "300").await?;

    // External collaborator base URLs; empty = port disabled (logged no-op)
    ensure_setting(pool, "calendar_base_url", "").await?;
    ensure_setting(pool, "email_base_url", "").await?;
    ensure_setting(pool, "transcriber_base_url", "").await?;

    // Cron endpoint shared secret; generated once, empty disables the check
    let existing: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'cron_shared_secret'")
            .fetch_optional(pool)
            .await?;
    if existing.is_none() {
        ensure_setting(pool, "cron_shared_secret", &generate_secret()).await?;
    }

    info!("Default settings initialized");
    Ok(())
}

/// Generate a random hex secret for the cron endpoint
fn generate_secret() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| format!("{:x}", rng.gen_range(0..16u8)))
        .collect()
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization races
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;
        warn!(
            "Setting '{}' was NULL, reset to default: {}",
            key, default_value
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_database_creates_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cadence.db");
        let pool = init_database(&db_path).await.unwrap();
        assert!(db_path.exists());

        // Schema is queryable
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meetings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        // Defaults exist, secret is non-empty
        let secret: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = 'cron_shared_secret'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(!secret.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ensure_setting_is_idempotent() {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_settings_table(&pool).await.unwrap();

        ensure_setting(&pool, "k", "v1").await.unwrap();
        ensure_setting(&pool, "k", "v2").await.unwrap();

        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = 'k'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("v1"));
    }
}

//! Periodic sweep: recurring-meeting regeneration plus 24h/1h reminders.
//!
//! The same pass runs from the cron endpoint and from the in-process
//! interval task; both report counts and a per-item error list instead of
//! failing wholesale.

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info};

use cadence_common::config::get_setting;
use cadence_common::db::models::Meeting;

use crate::effects::Effects;
use crate::schedule;

#[derive(Debug, Serialize)]
pub struct SweepReport {
    pub generated: usize,
    pub reminders: usize,
    pub errors: Vec<String>,
}

/// Run one full sweep pass
pub async fn run_sweep(
    pool: &SqlitePool,
    effects: &Effects,
) -> Result<SweepReport, sqlx::Error> {
    let now = Utc::now();

    let (generated, mut errors) = schedule::run_regeneration(pool, effects, now).await?;
    let reminders = send_reminders(pool, effects, &mut errors).await?;

    if !generated.is_empty() || reminders > 0 || !errors.is_empty() {
        info!(
            generated = generated.len(),
            reminders,
            errors = errors.len(),
            "sweep pass finished"
        );
    }

    Ok(SweepReport {
        generated: generated.len(),
        reminders,
        errors,
    })
}

/// Notify participants of SCHEDULED meetings coming up within 24 hours and
/// within 1 hour. Each window has its own sent flag so a meeting gets at
/// most one reminder per window.
async fn send_reminders(
    pool: &SqlitePool,
    effects: &Effects,
    errors: &mut Vec<String>,
) -> Result<usize, sqlx::Error> {
    let now = Utc::now();
    let mut sent = 0;

    for (flag_column, horizon, label) in [
        ("reminder_24h_sent", Duration::hours(24), "in 24 hours"),
        ("reminder_1h_sent", Duration::hours(1), "in 1 hour"),
    ] {
        let query = format!(
            "SELECT * FROM meetings
             WHERE status = 'SCHEDULED' AND {flag} = 0
               AND meeting_date > ? AND meeting_date <= ?",
            flag = flag_column
        );
        let rows = sqlx::query(&query)
            .bind(now)
            .bind(now + horizon)
            .fetch_all(pool)
            .await?;

        for row in &rows {
            let meeting = match Meeting::from_row(row) {
                Ok(m) => m,
                Err(e) => {
                    errors.push(format!("unreadable meeting row: {}", e));
                    continue;
                }
            };

            let message = format!("Your one-on-one starts {}", label);
            for user_id in [&meeting.employee_id, &meeting.reporter_id] {
                effects
                    .notify_user(user_id, "meeting_reminder", &message, Some(&meeting.id))
                    .await;
            }

            let update = format!("UPDATE meetings SET {flag} = 1 WHERE id = ?", flag = flag_column);
            sqlx::query(&update).bind(&meeting.id).execute(pool).await?;
            sent += 1;
        }
    }

    Ok(sent)
}

/// Spawn the in-process sweep loop. `sweep_interval_secs = 0` disables it,
/// leaving the cron endpoint as the only trigger.
pub async fn spawn_periodic(pool: SqlitePool, effects: Effects) {
    let interval_secs = match get_setting(&pool, "sweep_interval_secs", "300").await {
        Ok(v) => v.parse::<u64>().unwrap_or(300),
        Err(e) => {
            error!("failed to read sweep_interval_secs, using default: {}", e);
            300
        }
    };

    if interval_secs == 0 {
        info!("periodic sweep disabled (sweep_interval_secs = 0)");
        return;
    }

    info!("periodic sweep every {}s", interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately; skip it so startup stays quiet
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = run_sweep(&pool, &effects).await {
                error!("sweep pass failed: {}", e);
            }
        }
    });
}

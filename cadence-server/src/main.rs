//! Cadence server - main entry point
//!
//! One-on-one meeting management service: proposals, conflict detection,
//! recurring schedules, reminders and recording processing over a SQLite
//! store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cadence_common::config::{database_path, get_setting, resolve_root_folder};
use cadence_common::db::init_database;

use cadence_server::effects::http::{HttpCalendar, HttpEmail, HttpTranscriber};
use cadence_server::effects::notify::DbNotifier;
use cadence_server::effects::Effects;
use cadence_server::{build_router, sweep, AppState};

/// Command-line arguments for cadence-server
#[derive(Parser, Debug)]
#[command(name = "cadence-server")]
#[command(about = "One-on-one meeting management service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5750", env = "CADENCE_PORT")]
    port: u16,

    /// Root folder for the database and stored files
    #[arg(short, long, env = "CADENCE_ROOT_FOLDER")]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!(
        "Starting cadence-server {} ({} {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP"),
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), "CADENCE_ROOT_FOLDER")
        .context("Failed to resolve root folder")?;
    info!("Root folder: {}", root_folder.display());

    let db_path = database_path(&root_folder).context("Failed to resolve database path")?;
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!("Database ready at {}", db_path.display());

    let calendar_base = get_setting(&pool, "calendar_base_url", "").await?;
    let email_base = get_setting(&pool, "email_base_url", "").await?;
    let transcriber_base = get_setting(&pool, "transcriber_base_url", "").await?;

    let effects = Effects {
        calendar: Arc::new(HttpCalendar::new(calendar_base)),
        email: Arc::new(HttpEmail::new(email_base)),
        notifier: Arc::new(DbNotifier::new(pool.clone())),
        transcriber: Arc::new(HttpTranscriber::new(transcriber_base)),
    };

    sweep::spawn_periodic(pool.clone(), effects.clone()).await;

    let app = build_router(AppState {
        db: pool,
        effects,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}

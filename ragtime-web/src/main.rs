//! Ragtime web application - Main entry point
//!
//! Wires configuration, database initialization and the HTTP router, then
//! serves until SIGINT/SIGTERM.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use ragtime_common::config::{Config, Profile};
use ragtime_common::db::init::{init_database, init_database_in_memory};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ragtime_web::{build_router, AppState};

/// Command-line arguments for ragtime-web
#[derive(Parser, Debug)]
#[command(name = "ragtime-web")]
#[command(about = "Ragtime - a social site for musicians")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5700", env = "RAGTIME_PORT")]
    port: u16,

    /// Root folder holding the SQLite database
    #[arg(short, long, env = "RAGTIME_ROOT_FOLDER")]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ragtime_web=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    let config = Config::load(args.root_folder.as_deref()).context("Failed to load configuration")?;
    info!("Starting Ragtime ({} profile) on port {}", config.profile.name(), args.port);
    info!("Root folder: {}", config.root_folder.display());

    if config.profile == Profile::Production && config.ssl_redirect {
        // No TLS stack in-process; the reverse proxy terminates HTTPS
        warn!("ssl_redirect is set: serving plain HTTP, HTTPS termination expected upstream");
    }

    // Initialize database (in-memory for the testing profile)
    let pool = match config.database_path() {
        Some(path) => init_database(&path).await.context("Failed to initialize database")?,
        None => init_database_in_memory()
            .await
            .context("Failed to initialize in-memory database")?,
    };
    info!("Database ready");

    let purged = ragtime_common::db::sessions::purge_expired(&pool)
        .await
        .context("Failed to purge expired sessions")?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }

    let state = AppState::new(pool, config);
    let app = build_router(state);

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
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

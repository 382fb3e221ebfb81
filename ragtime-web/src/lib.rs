//! ragtime-web library - the Ragtime web application
//!
//! Session-based HTML site (home, profiles, compose, auth flows) plus a
//! versioned JSON API mounted under /api/v1.

use axum::routing::get;
use axum::{Json, Router};
use ragtime_common::config::Config;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod auth;
pub mod fake;
pub mod flash;
pub mod notify;
pub mod session;
pub mod site;
pub mod templates;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Process-wide configuration (profile, secrets, admin contact)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

/// GET /health - Health check endpoint (no auth)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "ragtime-web".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Build application router
///
/// Three route groups mirror the application structure: the main site,
/// the auth flows, and the JSON API under its version prefix.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(site::routes())
        .merge(auth::routes())
        .nest("/api/v1", api::routes())
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

//! Versioned JSON API, mounted under /api/v1

use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::AppState;

pub mod authentication;
pub mod comments;
pub mod compositions;
pub mod errors;
pub mod users;

pub use authentication::ApiUser;
pub use errors::ApiError;

/// API route group (paths here are relative to the /api/v1 prefix)
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tokens", post(authentication::issue_token))
        .route(
            "/compositions",
            get(compositions::list).post(compositions::create),
        )
        .route(
            "/compositions/:slug",
            get(compositions::show).put(compositions::update),
        )
        .route(
            "/compositions/:slug/comments",
            get(comments::list_for_composition).post(comments::create),
        )
        .route("/comments/:id", get(comments::show).delete(comments::disable))
        .route("/users/:username", get(users::show))
        .route("/users/:username/compositions", get(users::compositions_of))
        .route("/users/:username/timeline", get(users::timeline_of))
        .route("/users/:username/followers", get(users::followers_of))
        .route("/users/:username/following", get(users::following_of))
}

/// `page` query parameter for paginated listings
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<i64>,
}

/// Envelope for paginated listings
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub total_pages: i64,
    pub total: i64,
}

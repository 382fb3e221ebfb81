//! Authentication routes: login, logout, registration

use axum::routing::get;
use axum::Router;

use crate::AppState;

pub mod forms;
pub mod handlers;

pub use handlers::safe_next;

/// Auth route group
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(handlers::login_form).post(handlers::login_submit))
        .route("/logout", get(handlers::logout))
        .route("/register", get(handlers::register_form).post(handlers::register_submit))
}

//! Session-based login state
//!
//! A login creates a server-side session row; the browser holds only a
//! random token in an HttpOnly cookie. Handlers receive the login state
//! through the `MaybeUser` / `CurrentUser` extractors.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use ragtime_common::db::init::get_setting_i64;
use ragtime_common::db::models::User;
use ragtime_common::db::{sessions, users};
use tracing::warn;

use crate::AppState;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "ragtime_session";

/// Extract a cookie value from request headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        let Some((key, value)) = pair.trim().split_once('=') else {
            continue;
        };
        if key == name {
            return Some(value.to_string());
        }
    }
    None
}

/// Build the Set-Cookie value for a fresh session token
pub fn session_cookie(token: &str, max_age_seconds: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_seconds
    )
}

/// Build the Set-Cookie value that clears the session cookie
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Create a session for a verified user and return the Set-Cookie value
///
/// "Remember me" extends the session lifetime from the short default to the
/// long-lived value, both taken from the settings table.
pub async fn issue_session(
    state: &AppState,
    user: &User,
    remember: bool,
) -> ragtime_common::Result<String> {
    let ttl = if remember {
        get_setting_i64(&state.db, "remember_session_timeout_seconds", 31_536_000).await?
    } else {
        get_setting_i64(&state.db, "session_timeout_seconds", 86_400).await?
    };

    let token = sessions::create_session(&state.db, &user.guid, remember, ttl).await?;
    users::update_last_seen(&state.db, &user.guid).await?;

    Ok(session_cookie(&token, ttl))
}

/// The authenticated user plus the permission bits of their role
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub permissions: i64,
}

impl CurrentUser {
    pub fn can(&self, permission: i64) -> bool {
        self.permissions & permission == permission
    }
}

/// Login state for pages that render for both visitors and members
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = cookie_value(&parts.headers, SESSION_COOKIE) else {
            return Ok(MaybeUser(None));
        };

        match sessions::find_user_by_token(&state.db, &token).await {
            Ok(Some((user, permissions))) => {
                // Keep the profile's "last seen" current; failures are not fatal
                if let Err(e) = users::update_last_seen(&state.db, &user.guid).await {
                    warn!("Failed to update last_seen for {}: {}", user.username, e);
                }
                Ok(MaybeUser(Some(CurrentUser { user, permissions })))
            }
            Ok(None) => Ok(MaybeUser(None)),
            Err(e) => {
                warn!("Session lookup failed: {}", e);
                Ok(MaybeUser(None))
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    /// Anonymous requests to login-required pages are sent to the login
    /// form, carrying the original path for the post-login redirect
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let MaybeUser(current) = MaybeUser::from_request_parts(parts, state)
            .await
            .unwrap_or(MaybeUser(None));

        match current {
            Some(user) => Ok(user),
            None => {
                // Encoded so paths containing ? or & survive the query string
                let next = crate::flash::percent_encode(parts.uri.path());
                Err(Redirect::to(&format!("/login?next={}", next)).into_response())
            }
        }
    }
}

//! Bearer-token authentication for the JSON API
//!
//! `POST /api/v1/tokens` exchanges email/password for a token backed by the
//! same sessions table the HTML site uses. Protected endpoints extract an
//! `ApiUser` from the `Authorization: Bearer` header.

use axum::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use ragtime_common::auth::verify_password;
use ragtime_common::db::init::get_setting_i64;
use ragtime_common::db::models::User;
use ragtime_common::db::{sessions, users};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::errors::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_in: i64,
}

/// POST /tokens - issue a bearer token for valid credentials
pub async fn issue_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = users::find_by_email(&state.db, &request.email).await?;

    let verified = user
        .as_ref()
        .is_some_and(|u| verify_password(&request.password, &u.password_hash));

    let Some(user) = user.filter(|_| verified) else {
        info!("Rejected token request for {}", request.email);
        return Err(ApiError::Unauthorized);
    };

    let ttl = get_setting_i64(&state.db, "session_timeout_seconds", 86_400).await?;
    let token = sessions::create_session(&state.db, &user.guid, false, ttl).await?;
    users::update_last_seen(&state.db, &user.guid).await?;

    Ok(Json(TokenResponse {
        token,
        expires_in: ttl,
    }))
}

/// Extract the bearer token from an Authorization header value
fn bearer_token(value: &str) -> Option<&str> {
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// The authenticated API caller plus their role's permission bits
#[derive(Debug, Clone)]
pub struct ApiUser {
    pub user: User,
    pub permissions: i64,
}

impl ApiUser {
    pub fn can(&self, permission: i64) -> bool {
        self.permissions & permission == permission
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ApiUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or(ApiError::Unauthorized)?;

        match sessions::find_user_by_token(&state.db, token).await? {
            Some((user, permissions)) => Ok(ApiUser { user, permissions }),
            None => Err(ApiError::Unauthorized),
        }
    }
}

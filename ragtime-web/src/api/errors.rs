//! JSON API error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// API error, rendered as `{"error": ...}` with the matching status code
#[derive(Debug)]
pub enum ApiError {
    /// 400 - malformed or invalid request payload
    BadRequest(String),
    /// 401 - missing or invalid bearer token / credentials
    Unauthorized,
    /// 403 - authenticated but not allowed
    Forbidden,
    /// 404 - no such resource
    NotFound(String),
    /// 409 - uniqueness conflict
    Conflict(String),
    /// 500 - everything else; details go to the log, not the client
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ragtime_common::Error> for ApiError {
    fn from(e: ragtime_common::Error) -> Self {
        match e {
            ragtime_common::Error::NotFound(message) => ApiError::NotFound(message),
            ragtime_common::Error::InvalidInput(message) => ApiError::BadRequest(message),
            ragtime_common::Error::Conflict(message) => ApiError::Conflict(message),
            ragtime_common::Error::Unauthorized(_) => ApiError::Unauthorized,
            other => {
                error!("API request failed: {}", other);
                ApiError::Internal
            }
        }
    }
}

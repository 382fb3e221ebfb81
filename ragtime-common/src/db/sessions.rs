//! Login session queries
//!
//! Sessions are server-side rows keyed by the SHA-256 hash of the cookie
//! token; the plaintext token only ever lives in the user's cookie.

use crate::auth::{generate_token, token_hash};
use crate::db::models::User;
use crate::Result;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;

/// Create a session row and return the plaintext token for the cookie
pub async fn create_session(
    pool: &SqlitePool,
    user_guid: &str,
    remember: bool,
    ttl_seconds: i64,
) -> Result<String> {
    let token = generate_token();
    let expires_at = Utc::now().naive_utc() + Duration::seconds(ttl_seconds);

    sqlx::query(
        r#"
        INSERT INTO sessions (token_hash, user_id, remember, expires_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(token_hash(&token))
    .bind(user_guid)
    .bind(remember)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(token)
}

/// Resolve a token to its user plus permission bits; expired sessions yield None
pub async fn find_user_by_token(pool: &SqlitePool, token: &str) -> Result<Option<(User, i64)>> {
    let row: Option<(String, i64)> = sqlx::query_as(
        r#"
        SELECT sessions.user_id, roles.permissions FROM sessions
        JOIN users ON users.guid = sessions.user_id
        JOIN roles ON roles.guid = users.role_id
        WHERE sessions.token_hash = ? AND sessions.expires_at > ?
        "#,
    )
    .bind(token_hash(token))
    .bind(Utc::now().naive_utc())
    .fetch_optional(pool)
    .await?;

    let Some((user_id, permissions)) = row else {
        return Ok(None);
    };

    let user = crate::db::users::find_by_guid(pool, &user_id).await?;
    Ok(user.map(|u| (u, permissions)))
}

/// Delete the session behind a token (logout)
pub async fn delete_by_token(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(token_hash(token))
        .execute(pool)
        .await?;

    Ok(())
}

/// Number of live (unexpired) sessions for a user
pub async fn live_session_count(pool: &SqlitePool, user_guid: &str) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE user_id = ? AND expires_at > ?")
            .bind(user_guid)
            .bind(Utc::now().naive_utc())
            .fetch_one(pool)
            .await?;

    Ok(count)
}

/// Remove expired sessions; returns the number deleted
pub async fn purge_expired(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(Utc::now().naive_utc())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

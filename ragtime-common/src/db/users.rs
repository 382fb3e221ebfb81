//! User queries

use crate::db::init::{ADMIN_ROLE_GUID, FAN_ROLE_GUID};
use crate::db::models::User;
use crate::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Create and persist a new user
///
/// The role is the default (Fan) role, except that the configured admin
/// email receives the Administrator role. Every user follows themselves so
/// their own compositions appear in their timeline.
pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    username: &str,
    password_hash: &str,
    admin_email: Option<&str>,
) -> Result<User> {
    let guid = Uuid::new_v4().to_string();

    let role_id = if admin_email.is_some_and(|admin| admin.eq_ignore_ascii_case(email)) {
        ADMIN_ROLE_GUID
    } else {
        FAN_ROLE_GUID
    };

    sqlx::query(
        r#"
        INSERT INTO users (guid, email, username, password_hash, role_id)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(email)
    .bind(username)
    .bind(password_hash)
    .bind(role_id)
    .execute(pool)
    .await
    .map_err(|e| {
        let err = Error::Database(e);
        if err.is_unique_violation() {
            Error::Conflict("email or username already registered".to_string())
        } else {
            err
        }
    })?;

    // Self-follow so the timeline includes the user's own work
    sqlx::query("INSERT OR IGNORE INTO follows (follower_id, followed_id) VALUES (?, ?)")
        .bind(&guid)
        .bind(&guid)
        .execute(pool)
        .await?;

    find_by_guid(pool, &guid)
        .await?
        .ok_or_else(|| Error::Internal("user vanished after insert".to_string()))
}

pub async fn find_by_guid(pool: &SqlitePool, guid: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Combined permission bits for a user's role
pub async fn permissions_of(pool: &SqlitePool, user_guid: &str) -> Result<i64> {
    let permissions: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT roles.permissions FROM users
        JOIN roles ON roles.guid = users.role_id
        WHERE users.guid = ?
        "#,
    )
    .bind(user_guid)
    .fetch_optional(pool)
    .await?;

    permissions.ok_or_else(|| Error::NotFound(format!("user {}", user_guid)))
}

pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Record activity for the "last seen" profile field
pub async fn update_last_seen(pool: &SqlitePool, user_guid: &str) -> Result<()> {
    sqlx::query("UPDATE users SET last_seen = CURRENT_TIMESTAMP WHERE guid = ?")
        .bind(user_guid)
        .execute(pool)
        .await?;

    Ok(())
}

/// Update the optional profile fields
pub async fn update_profile(
    pool: &SqlitePool,
    user_guid: &str,
    name: Option<&str>,
    location: Option<&str>,
    bio: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE users SET name = ?, location = ?, bio = ? WHERE guid = ?")
        .bind(name)
        .bind(location)
        .bind(bio)
        .bind(user_guid)
        .execute(pool)
        .await?;

    Ok(())
}

/// Earliest-registered user, used by the bringup tool to print a sample login
pub async fn first_user(pool: &SqlitePool) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY rowid ASC LIMIT 1")
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

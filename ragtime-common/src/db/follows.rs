//! Follow relationship queries

use crate::db::models::User;
use crate::Result;
use sqlx::SqlitePool;

/// Record a directed follow; duplicates are ignored (one row per pair)
pub async fn follow(pool: &SqlitePool, follower_id: &str, followed_id: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO follows (follower_id, followed_id) VALUES (?, ?)")
        .bind(follower_id)
        .bind(followed_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn unfollow(pool: &SqlitePool, follower_id: &str, followed_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followed_id = ?")
        .bind(follower_id)
        .bind(followed_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn is_following(pool: &SqlitePool, follower_id: &str, followed_id: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ? AND followed_id = ?)",
    )
    .bind(follower_id)
    .bind(followed_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Users following the given user (excluding the self-follow)
pub async fn followers(
    pool: &SqlitePool,
    user_guid: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<User>> {
    let rows = sqlx::query_as::<_, User>(
        r#"
        SELECT users.* FROM users
        JOIN follows ON follows.follower_id = users.guid
        WHERE follows.followed_id = ? AND follows.follower_id != ?
        ORDER BY follows.created_at DESC, users.rowid DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_guid)
    .bind(user_guid)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Users the given user follows (excluding the self-follow)
pub async fn following(
    pool: &SqlitePool,
    user_guid: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<User>> {
    let rows = sqlx::query_as::<_, User>(
        r#"
        SELECT users.* FROM users
        JOIN follows ON follows.followed_id = users.guid
        WHERE follows.follower_id = ? AND follows.followed_id != ?
        ORDER BY follows.created_at DESC, users.rowid DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_guid)
    .bind(user_guid)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn follower_count(pool: &SqlitePool, user_guid: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM follows WHERE followed_id = ? AND follower_id != ?",
    )
    .bind(user_guid)
    .bind(user_guid)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

pub async fn following_count(pool: &SqlitePool, user_guid: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND followed_id != ?",
    )
    .bind(user_guid)
    .bind(user_guid)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

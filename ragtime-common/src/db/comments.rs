//! Comment queries

use crate::db::models::Comment;
use crate::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn create_comment(
    pool: &SqlitePool,
    composition_id: &str,
    artist_id: &str,
    body: &str,
) -> Result<Comment> {
    if body.trim().is_empty() {
        return Err(Error::InvalidInput("comment body must not be empty".to_string()));
    }

    let guid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO comments (guid, body, artist_id, composition_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(body.trim())
    .bind(artist_id)
    .bind(composition_id)
    .execute(pool)
    .await?;

    find_by_guid(pool, &guid)
        .await?
        .ok_or_else(|| Error::Internal("comment vanished after insert".to_string()))
}

pub async fn find_by_guid(pool: &SqlitePool, guid: &str) -> Result<Option<Comment>> {
    let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;

    Ok(comment)
}

/// Comments on a composition, oldest first; moderated (disabled) comments
/// are excluded
pub async fn list_for_composition(
    pool: &SqlitePool,
    composition_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Comment>> {
    let rows = sqlx::query_as::<_, Comment>(
        r#"
        SELECT * FROM comments
        WHERE composition_id = ? AND disabled = 0
        ORDER BY created_at ASC, rowid ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(composition_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn count_for_composition(pool: &SqlitePool, composition_id: &str) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE composition_id = ? AND disabled = 0")
            .bind(composition_id)
            .fetch_one(pool)
            .await?;

    Ok(count)
}

/// Moderation toggle (requires the MODERATE permission at the route layer)
pub async fn set_disabled(pool: &SqlitePool, guid: &str, disabled: bool) -> Result<()> {
    let result = sqlx::query("UPDATE comments SET disabled = ? WHERE guid = ?")
        .bind(disabled)
        .bind(guid)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("comment {}", guid)));
    }

    Ok(())
}

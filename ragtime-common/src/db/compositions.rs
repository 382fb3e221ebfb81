//! Composition queries

use crate::db::models::Composition;
use crate::slug::generate_slug;
use crate::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

fn map_slug_conflict(e: sqlx::Error) -> Error {
    let err = Error::Database(e);
    if err.is_unique_violation() {
        Error::Conflict("a composition with this slug already exists".to_string())
    } else {
        err
    }
}

/// Create and persist a new composition
///
/// The slug is derived from a guid prefix plus the slugified title, which
/// keeps slugs URL-safe and unique; the database still enforces uniqueness
/// via the slug index.
pub async fn create_composition(
    pool: &SqlitePool,
    artist_id: &str,
    release_type: i64,
    title: &str,
    description: Option<&str>,
) -> Result<Composition> {
    if title.trim().is_empty() {
        return Err(Error::InvalidInput("title must not be empty".to_string()));
    }

    let guid = Uuid::new_v4().to_string();
    let slug = generate_slug(&guid[..8], title);

    sqlx::query(
        r#"
        INSERT INTO compositions (guid, release_type, title, description, slug, artist_id)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(release_type)
    .bind(title.trim())
    .bind(description)
    .bind(&slug)
    .bind(artist_id)
    .execute(pool)
    .await
    .map_err(map_slug_conflict)?;

    find_by_guid(pool, &guid)
        .await?
        .ok_or_else(|| Error::Internal("composition vanished after insert".to_string()))
}

/// Update title/description; a changed title regenerates the slug
///
/// Returns the updated row (callers need the possibly-new slug).
pub async fn update_composition(
    pool: &SqlitePool,
    composition: &Composition,
    title: &str,
    description: Option<&str>,
) -> Result<Composition> {
    if title.trim().is_empty() {
        return Err(Error::InvalidInput("title must not be empty".to_string()));
    }

    let slug = if title.trim() == composition.title {
        composition.slug.clone()
    } else {
        generate_slug(&composition.guid[..8], title)
    };

    sqlx::query("UPDATE compositions SET title = ?, description = ?, slug = ? WHERE guid = ?")
        .bind(title.trim())
        .bind(description)
        .bind(&slug)
        .bind(&composition.guid)
        .execute(pool)
        .await
        .map_err(map_slug_conflict)?;

    find_by_guid(pool, &composition.guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("composition {}", composition.guid)))
}

pub async fn find_by_guid(pool: &SqlitePool, guid: &str) -> Result<Option<Composition>> {
    let composition = sqlx::query_as::<_, Composition>("SELECT * FROM compositions WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;

    Ok(composition)
}

pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Composition>> {
    let composition = sqlx::query_as::<_, Composition>("SELECT * FROM compositions WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(composition)
}

pub async fn count_all(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM compositions")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

pub async fn count_by_artist(pool: &SqlitePool, artist_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM compositions WHERE artist_id = ?")
        .bind(artist_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Recent compositions across all artists, newest first
pub async fn list_recent(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Composition>> {
    let rows = sqlx::query_as::<_, Composition>(
        "SELECT * FROM compositions ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// One artist's compositions, newest first
pub async fn list_by_artist(
    pool: &SqlitePool,
    artist_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Composition>> {
    let rows = sqlx::query_as::<_, Composition>(
        r#"
        SELECT * FROM compositions WHERE artist_id = ?
        ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?
        "#,
    )
    .bind(artist_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Compositions by artists the user follows (the user's timeline)
///
/// Self-follow at registration means the user's own work is included.
pub async fn timeline_for(
    pool: &SqlitePool,
    user_guid: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Composition>> {
    let rows = sqlx::query_as::<_, Composition>(
        r#"
        SELECT compositions.* FROM compositions
        JOIN follows ON follows.followed_id = compositions.artist_id
        WHERE follows.follower_id = ?
        ORDER BY compositions.created_at DESC, compositions.rowid DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_guid)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn count_timeline_for(pool: &SqlitePool, user_guid: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM compositions
        JOIN follows ON follows.followed_id = compositions.artist_id
        WHERE follows.follower_id = ?
        "#,
    )
    .bind(user_guid)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

pub async fn delete_composition(pool: &SqlitePool, guid: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM compositions WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("composition {}", guid)));
    }

    Ok(())
}

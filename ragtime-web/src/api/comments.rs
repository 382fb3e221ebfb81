//! Comment endpoints

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use ragtime_common::db::init::get_setting_i64;
use ragtime_common::db::models::{permission, Comment};
use ragtime_common::db::{comments, compositions, users};
use ragtime_common::pagination::calculate_pagination;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::api::{ApiError, ApiUser, PageQuery, Paginated};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CommentJson {
    pub guid: String,
    pub body: String,
    pub author: String,
    pub composition: String,
    pub created_at: NaiveDateTime,
}

async fn to_json(pool: &SqlitePool, comment: Comment) -> Result<CommentJson, ApiError> {
    let author = users::find_by_guid(pool, &comment.artist_id)
        .await?
        .map(|a| a.username)
        .unwrap_or_else(|| "unknown".to_string());

    let composition = compositions::find_by_guid(pool, &comment.composition_id)
        .await?
        .map(|c| c.slug)
        .unwrap_or_default();

    Ok(CommentJson {
        guid: comment.guid,
        body: comment.body,
        author,
        composition,
        created_at: comment.created_at,
    })
}

/// GET /compositions/:slug/comments - oldest first, paginated
pub async fn list_for_composition(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<CommentJson>>, ApiError> {
    let composition = compositions::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("composition {}", slug)))?;

    let per_page = get_setting_i64(&state.db, "comments_per_page", 30).await?;
    let total = comments::count_for_composition(&state.db, &composition.guid).await?;
    let p = calculate_pagination(total, query.page.unwrap_or(1), per_page);
    let items =
        comments::list_for_composition(&state.db, &composition.guid, p.per_page, p.offset).await?;

    let mut out = Vec::with_capacity(items.len());
    for comment in items {
        out.push(to_json(&state.db, comment).await?);
    }

    Ok(Json(Paginated {
        items: out,
        page: p.page,
        total_pages: p.total_pages,
        total,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateComment {
    pub body: String,
}

/// POST /compositions/:slug/comments (COMMENT permission)
pub async fn create(
    State(state): State<AppState>,
    caller: ApiUser,
    Path(slug): Path<String>,
    Json(request): Json<CreateComment>,
) -> Result<(StatusCode, Json<CommentJson>), ApiError> {
    if !caller.can(permission::COMMENT) {
        return Err(ApiError::Forbidden);
    }

    let composition = compositions::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("composition {}", slug)))?;

    let comment =
        comments::create_comment(&state.db, &composition.guid, &caller.user.guid, &request.body)
            .await?;

    Ok((StatusCode::CREATED, Json(to_json(&state.db, comment).await?)))
}

/// DELETE /comments/:id - hide a comment (MODERATE permission)
///
/// Moderation disables rather than deletes; the row stays for audit.
pub async fn disable(
    State(state): State<AppState>,
    caller: ApiUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !caller.can(permission::MODERATE) {
        return Err(ApiError::Forbidden);
    }

    comments::set_disabled(&state.db, &id, true).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /comments/:id
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CommentJson>, ApiError> {
    let comment = comments::find_by_guid(&state.db, &id)
        .await?
        .filter(|c| !c.disabled)
        .ok_or_else(|| ApiError::NotFound(format!("comment {}", id)))?;

    Ok(Json(to_json(&state.db, comment).await?))
}

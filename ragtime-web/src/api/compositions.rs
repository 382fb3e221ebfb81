//! Composition endpoints

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use ragtime_common::db::init::get_setting_i64;
use ragtime_common::db::models::{permission, Composition, ReleaseType};
use ragtime_common::db::{compositions, users};
use ragtime_common::pagination::{calculate_pagination, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::api::{ApiError, ApiUser, PageQuery, Paginated};
use crate::AppState;

/// Composition as the API renders it; `artist` is the username, not the guid
#[derive(Debug, Serialize)]
pub struct CompositionJson {
    pub guid: String,
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub release_type: ReleaseType,
    pub artist: String,
    pub created_at: NaiveDateTime,
}

pub(crate) async fn to_json(
    pool: &SqlitePool,
    composition: Composition,
) -> Result<CompositionJson, ApiError> {
    let artist = users::find_by_guid(pool, &composition.artist_id)
        .await?
        .map(|a| a.username)
        .unwrap_or_else(|| "unknown".to_string());

    let release_type = ReleaseType::from_i64(composition.release_type)
        .ok_or_else(|| ApiError::BadRequest("unknown release type".to_string()))?;

    Ok(CompositionJson {
        guid: composition.guid,
        title: composition.title,
        description: composition.description,
        slug: composition.slug,
        release_type,
        artist,
        created_at: composition.created_at,
    })
}

pub(crate) async fn to_json_page(
    pool: &SqlitePool,
    items: Vec<Composition>,
) -> Result<Vec<CompositionJson>, ApiError> {
    let mut out = Vec::with_capacity(items.len());
    for composition in items {
        out.push(to_json(pool, composition).await?);
    }
    Ok(out)
}

/// GET /compositions - recent compositions, paginated
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<CompositionJson>>, ApiError> {
    let per_page = get_setting_i64(&state.db, "compositions_per_page", DEFAULT_PAGE_SIZE).await?;
    let total = compositions::count_all(&state.db).await?;
    let p = calculate_pagination(total, query.page.unwrap_or(1), per_page);
    let items = compositions::list_recent(&state.db, p.per_page, p.offset).await?;

    Ok(Json(Paginated {
        items: to_json_page(&state.db, items).await?,
        page: p.page,
        total_pages: p.total_pages,
        total,
    }))
}

/// GET /compositions/:slug
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<CompositionJson>, ApiError> {
    let composition = compositions::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("composition {}", slug)))?;

    Ok(Json(to_json(&state.db, composition).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateComposition {
    pub title: String,
    pub release_type: i64,
    #[serde(default)]
    pub description: Option<String>,
}

/// POST /compositions - publish (WRITE permission)
pub async fn create(
    State(state): State<AppState>,
    caller: ApiUser,
    Json(request): Json<CreateComposition>,
) -> Result<(StatusCode, Json<CompositionJson>), ApiError> {
    if !caller.can(permission::WRITE) {
        return Err(ApiError::Forbidden);
    }

    if ReleaseType::from_i64(request.release_type).is_none() {
        return Err(ApiError::BadRequest("unknown release type".to_string()));
    }

    let composition = compositions::create_composition(
        &state.db,
        &caller.user.guid,
        request.release_type,
        &request.title,
        request.description.as_deref().filter(|d| !d.trim().is_empty()),
    )
    .await?;

    info!(
        "API: {} published composition {}",
        caller.user.username, composition.slug
    );

    Ok((StatusCode::CREATED, Json(to_json(&state.db, composition).await?)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateComposition {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// PUT /compositions/:slug - edit (author or ADMIN)
pub async fn update(
    State(state): State<AppState>,
    caller: ApiUser,
    Path(slug): Path<String>,
    Json(request): Json<UpdateComposition>,
) -> Result<Json<CompositionJson>, ApiError> {
    let composition = compositions::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("composition {}", slug)))?;

    if composition.artist_id != caller.user.guid && !caller.can(permission::ADMIN) {
        return Err(ApiError::Forbidden);
    }

    let updated = compositions::update_composition(
        &state.db,
        &composition,
        &request.title,
        request.description.as_deref().filter(|d| !d.trim().is_empty()),
    )
    .await?;

    Ok(Json(to_json(&state.db, updated).await?))
}

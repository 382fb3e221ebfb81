//! User endpoints

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDateTime;
use ragtime_common::db::init::get_setting_i64;
use ragtime_common::db::models::User;
use ragtime_common::db::{compositions, follows, users};
use ragtime_common::pagination::{calculate_pagination, DEFAULT_PAGE_SIZE};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::api::compositions::{to_json_page, CompositionJson};
use crate::api::{ApiError, PageQuery, Paginated};
use crate::AppState;

/// Public profile shape; email and role stay private
#[derive(Debug, Serialize)]
pub struct UserJson {
    pub username: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub last_seen: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub followers: i64,
    pub following: i64,
    pub compositions: i64,
}

/// Abbreviated profile used in follower/following listings
#[derive(Debug, Serialize)]
pub struct UserBriefJson {
    pub username: String,
    pub name: Option<String>,
}

impl From<User> for UserBriefJson {
    fn from(user: User) -> Self {
        UserBriefJson {
            username: user.username,
            name: user.name,
        }
    }
}

async fn find_user(pool: &SqlitePool, username: &str) -> Result<User, ApiError> {
    users::find_by_username(pool, username)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {}", username)))
}

/// GET /users/:username
pub async fn show(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserJson>, ApiError> {
    let user = find_user(&state.db, &username).await?;

    let followers = follows::follower_count(&state.db, &user.guid).await?;
    let following = follows::following_count(&state.db, &user.guid).await?;
    let composition_count = compositions::count_by_artist(&state.db, &user.guid).await?;

    Ok(Json(UserJson {
        username: user.username,
        name: user.name,
        location: user.location,
        bio: user.bio,
        last_seen: user.last_seen,
        created_at: user.created_at,
        followers,
        following,
        compositions: composition_count,
    }))
}

/// GET /users/:username/compositions
pub async fn compositions_of(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<CompositionJson>>, ApiError> {
    let user = find_user(&state.db, &username).await?;

    let per_page = get_setting_i64(&state.db, "compositions_per_page", DEFAULT_PAGE_SIZE).await?;
    let total = compositions::count_by_artist(&state.db, &user.guid).await?;
    let p = calculate_pagination(total, query.page.unwrap_or(1), per_page);
    let items = compositions::list_by_artist(&state.db, &user.guid, p.per_page, p.offset).await?;

    Ok(Json(Paginated {
        items: to_json_page(&state.db, items).await?,
        page: p.page,
        total_pages: p.total_pages,
        total,
    }))
}

/// GET /users/:username/timeline - compositions by artists the user follows
pub async fn timeline_of(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<CompositionJson>>, ApiError> {
    let user = find_user(&state.db, &username).await?;

    let per_page = get_setting_i64(&state.db, "compositions_per_page", DEFAULT_PAGE_SIZE).await?;
    let total = compositions::count_timeline_for(&state.db, &user.guid).await?;
    let p = calculate_pagination(total, query.page.unwrap_or(1), per_page);
    let items = compositions::timeline_for(&state.db, &user.guid, p.per_page, p.offset).await?;

    Ok(Json(Paginated {
        items: to_json_page(&state.db, items).await?,
        page: p.page,
        total_pages: p.total_pages,
        total,
    }))
}

/// GET /users/:username/followers
pub async fn followers_of(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<UserBriefJson>>, ApiError> {
    let user = find_user(&state.db, &username).await?;

    let per_page = get_setting_i64(&state.db, "followers_per_page", 50).await?;
    let total = follows::follower_count(&state.db, &user.guid).await?;
    let p = calculate_pagination(total, query.page.unwrap_or(1), per_page);
    let items = follows::followers(&state.db, &user.guid, p.per_page, p.offset).await?;

    Ok(Json(Paginated {
        items: items.into_iter().map(UserBriefJson::from).collect(),
        page: p.page,
        total_pages: p.total_pages,
        total,
    }))
}

/// GET /users/:username/following
pub async fn following_of(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<UserBriefJson>>, ApiError> {
    let user = find_user(&state.db, &username).await?;

    let per_page = get_setting_i64(&state.db, "followers_per_page", 50).await?;
    let total = follows::following_count(&state.db, &user.guid).await?;
    let p = calculate_pagination(total, query.page.unwrap_or(1), per_page);
    let items = follows::following(&state.db, &user.guid, p.per_page, p.offset).await?;

    Ok(Json(Paginated {
        items: items.into_iter().map(UserBriefJson::from).collect(),
        page: p.page,
        total_pages: p.total_pages,
        total,
    }))
}

//! HTML site routes: home, profiles, follow controls, compose, composition
//! detail

use axum::extract::{Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use ragtime_common::db::init::get_setting_i64;
use ragtime_common::db::models::{permission, Composition, ReleaseType, User};
use ragtime_common::db::{comments, compositions, follows, users};
use ragtime_common::pagination::{calculate_pagination, Pagination, DEFAULT_PAGE_SIZE};
use serde::Deserialize;
use tracing::error;

use crate::flash::flash_cookie;
use crate::session::{CurrentUser, MaybeUser};
use crate::templates::{html_escape, render_page, COMPOSE_FORM};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/user/:username", get(profile))
        .route("/follow/:username", post(follow_user))
        .route("/unfollow/:username", post(unfollow_user))
        .route("/compose", get(compose_form).post(compose_submit))
        .route("/settings", get(settings_form).post(settings_submit))
        .route("/composition/:slug", get(composition_detail))
        .route("/composition/:slug/comments", post(comment_submit))
}

#[derive(Debug, Deserialize)]
pub struct PageParam {
    #[serde(default)]
    pub page: Option<i64>,
}

fn server_error(headers: &HeaderMap, user: Option<&CurrentUser>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        render_page(
            "Error",
            user,
            headers,
            "<p>Something went wrong. Please try again.</p>",
        ),
    )
        .into_response()
}

fn not_found(headers: &HeaderMap, user: Option<&CurrentUser>) -> Response {
    (
        StatusCode::NOT_FOUND,
        render_page("Not Found", user, headers, "<p>No such page.</p>"),
    )
        .into_response()
}

/// Prev/next links for paginated listings
fn page_links(base: &str, p: &Pagination) -> String {
    let mut links = String::new();
    if p.page > 1 {
        links.push_str(&format!(
            "<a href=\"{}?page={}\">&laquo; Newer</a> ",
            base,
            p.page - 1
        ));
    }
    if p.page < p.total_pages {
        links.push_str(&format!(
            "<a href=\"{}?page={}\">Older &raquo;</a>",
            base,
            p.page + 1
        ));
    }
    if links.is_empty() {
        links
    } else {
        format!("<nav class=\"pages\">{}</nav>", links)
    }
}

/// One composition rendered as a listing card
fn composition_card(composition: &Composition, artist: Option<&User>) -> String {
    let release = ReleaseType::from_i64(composition.release_type)
        .map(|r| r.label())
        .unwrap_or("Release");

    let byline = match artist {
        Some(artist) => format!(
            " by <a href=\"/user/{0}\">{0}</a>",
            html_escape(&artist.username)
        ),
        None => String::new(),
    };

    format!(
        "<article class=\"composition\">\
         <h3><a href=\"/composition/{slug}\">{title}</a></h3>\
         <p class=\"meta\">{release}{byline} &middot; {date}</p>\
         </article>",
        slug = html_escape(&composition.slug),
        title = html_escape(&composition.title),
        release = release,
        byline = byline,
        date = composition.created_at.format("%Y-%m-%d"),
    )
}

async fn cards_with_artists(
    state: &AppState,
    items: &[Composition],
) -> ragtime_common::Result<String> {
    let mut html = String::new();
    for composition in items {
        let artist = users::find_by_guid(&state.db, &composition.artist_id).await?;
        html.push_str(&composition_card(composition, artist.as_ref()));
    }
    Ok(html)
}

/// GET / - recent compositions across all artists
pub async fn home(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    headers: HeaderMap,
    Query(params): Query<PageParam>,
) -> Response {
    let result: ragtime_common::Result<(String, Pagination)> = async {
        let per_page =
            get_setting_i64(&state.db, "compositions_per_page", DEFAULT_PAGE_SIZE).await?;
        let total = compositions::count_all(&state.db).await?;
        let p = calculate_pagination(total, params.page.unwrap_or(1), per_page);
        let items = compositions::list_recent(&state.db, p.per_page, p.offset).await?;
        Ok((cards_with_artists(&state, &items).await?, p))
    }
    .await;

    let (cards, p) = match result {
        Ok(v) => v,
        Err(e) => {
            error!("Home page query failed: {}", e);
            return server_error(&headers, current.as_ref());
        }
    };

    let body = if cards.is_empty() {
        "<h1>Recent Compositions</h1><p>Nothing published yet.</p>".to_string()
    } else {
        format!(
            "<h1>Recent Compositions</h1>{}{}",
            cards,
            page_links("/", &p)
        )
    };

    render_page("Ragtime", current.as_ref(), &headers, &body).into_response()
}

/// GET /user/:username - profile with compositions and follow control
pub async fn profile(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    headers: HeaderMap,
    Path(username): Path<String>,
    Query(params): Query<PageParam>,
) -> Response {
    let subject = match users::find_by_username(&state.db, &username).await {
        Ok(Some(user)) => user,
        Ok(None) => return not_found(&headers, current.as_ref()),
        Err(e) => {
            error!("Profile lookup failed: {}", e);
            return server_error(&headers, current.as_ref());
        }
    };

    let result: ragtime_common::Result<(String, Pagination, i64, i64, bool)> = async {
        let per_page =
            get_setting_i64(&state.db, "compositions_per_page", DEFAULT_PAGE_SIZE).await?;
        let total = compositions::count_by_artist(&state.db, &subject.guid).await?;
        let p = calculate_pagination(total, params.page.unwrap_or(1), per_page);
        let items =
            compositions::list_by_artist(&state.db, &subject.guid, p.per_page, p.offset).await?;

        let mut cards = String::new();
        for composition in &items {
            cards.push_str(&composition_card(composition, None));
        }

        let followers = follows::follower_count(&state.db, &subject.guid).await?;
        let following = follows::following_count(&state.db, &subject.guid).await?;

        let viewer_follows = match &current {
            Some(viewer) if viewer.user.guid != subject.guid => {
                follows::is_following(&state.db, &viewer.user.guid, &subject.guid).await?
            }
            _ => false,
        };

        Ok((cards, p, followers, following, viewer_follows))
    }
    .await;

    let (cards, p, followers, following, viewer_follows) = match result {
        Ok(v) => v,
        Err(e) => {
            error!("Profile page query failed: {}", e);
            return server_error(&headers, current.as_ref());
        }
    };

    let mut body = format!("<h1>{}</h1>", html_escape(&subject.username));
    if let Some(name) = subject.name.as_deref().filter(|n| !n.is_empty()) {
        body.push_str(&format!("<p>{}</p>", html_escape(name)));
    }
    if let Some(location) = subject.location.as_deref().filter(|l| !l.is_empty()) {
        body.push_str(&format!("<p>From {}</p>", html_escape(location)));
    }
    if let Some(bio) = subject.bio.as_deref().filter(|b| !b.is_empty()) {
        body.push_str(&format!("<p>{}</p>", html_escape(bio)));
    }
    if let Some(last_seen) = subject.last_seen {
        body.push_str(&format!(
            "<p class=\"meta\">Last seen {}</p>",
            last_seen.format("%Y-%m-%d %H:%M")
        ));
    }
    body.push_str(&format!(
        "<p class=\"meta\">{} followers &middot; following {}</p>",
        followers, following
    ));

    // Follow control only makes sense for a logged-in viewer looking at
    // someone else
    if let Some(viewer) = current.as_ref().filter(|v| v.user.guid != subject.guid) {
        if viewer.can(permission::FOLLOW) {
            let (action, label) = if viewer_follows {
                ("unfollow", "Unfollow")
            } else {
                ("follow", "Follow")
            };
            body.push_str(&format!(
                "<form method=\"post\" action=\"/{}/{}\"><button type=\"submit\">{}</button></form>",
                action,
                html_escape(&subject.username),
                label
            ));
        }
    }

    body.push_str("<h2>Compositions</h2>");
    if cards.is_empty() {
        body.push_str("<p>Nothing published yet.</p>");
    } else {
        body.push_str(&cards);
        body.push_str(&page_links(&format!("/user/{}", subject.username), &p));
    }

    render_page(&subject.username, current.as_ref(), &headers, &body).into_response()
}

async fn change_follow(
    state: &AppState,
    viewer: &CurrentUser,
    username: &str,
    following: bool,
) -> Response {
    if !viewer.can(permission::FOLLOW) {
        return (
            [(SET_COOKIE, flash_cookie("You don't have permission to follow users."))],
            Redirect::to(&format!("/user/{}", username)),
        )
            .into_response();
    }

    let subject = match users::find_by_username(&state.db, username).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                [(SET_COOKIE, flash_cookie("No such user."))],
                Redirect::to("/"),
            )
                .into_response()
        }
        Err(e) => {
            error!("Follow target lookup failed: {}", e);
            return Redirect::to("/").into_response();
        }
    };

    if subject.guid == viewer.user.guid {
        return Redirect::to(&format!("/user/{}", username)).into_response();
    }

    let (result, message) = if following {
        (
            follows::follow(&state.db, &viewer.user.guid, &subject.guid).await,
            format!("You are now following {}.", subject.username),
        )
    } else {
        (
            follows::unfollow(&state.db, &viewer.user.guid, &subject.guid).await,
            format!("You are no longer following {}.", subject.username),
        )
    };

    if let Err(e) = result {
        error!("Follow change failed: {}", e);
        return Redirect::to(&format!("/user/{}", username)).into_response();
    }

    (
        [(SET_COOKIE, flash_cookie(&message))],
        Redirect::to(&format!("/user/{}", subject.username)),
    )
        .into_response()
}

/// POST /follow/:username
pub async fn follow_user(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Path(username): Path<String>,
) -> Response {
    change_follow(&state, &viewer, &username, true).await
}

/// POST /unfollow/:username
pub async fn unfollow_user(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Path(username): Path<String>,
) -> Response {
    change_follow(&state, &viewer, &username, false).await
}

#[derive(Debug, Deserialize)]
pub struct ComposeForm {
    pub title: String,
    pub release_type: i64,
    #[serde(default)]
    pub description: String,
}

fn compose_page(
    headers: &HeaderMap,
    user: &CurrentUser,
    form: Option<&ComposeForm>,
    error: Option<&str>,
) -> Response {
    let error_html = match error {
        Some(message) => format!("<p class=\"error\">{}</p>", html_escape(message)),
        None => String::new(),
    };

    let body = COMPOSE_FORM
        .replace("{{ERROR}}", &error_html)
        .replace(
            "{{TITLE_VALUE}}",
            &html_escape(form.map(|f| f.title.as_str()).unwrap_or("")),
        )
        .replace(
            "{{DESCRIPTION}}",
            &html_escape(form.map(|f| f.description.as_str()).unwrap_or("")),
        );

    render_page("Compose", Some(user), headers, &body).into_response()
}

/// GET /compose - publish form, WRITE permission required
pub async fn compose_form(user: CurrentUser, headers: HeaderMap) -> Response {
    if !user.can(permission::WRITE) {
        return (
            [(SET_COOKIE, flash_cookie("You don't have permission to publish."))],
            Redirect::to("/"),
        )
            .into_response();
    }

    compose_page(&headers, &user, None, None)
}

/// POST /compose - create the composition and show its page
pub async fn compose_submit(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Form(form): Form<ComposeForm>,
) -> Response {
    if !user.can(permission::WRITE) {
        return (
            [(SET_COOKIE, flash_cookie("You don't have permission to publish."))],
            Redirect::to("/"),
        )
            .into_response();
    }

    if ReleaseType::from_i64(form.release_type).is_none() {
        return compose_page(&headers, &user, Some(&form), Some("Pick a release type."));
    }

    let description = Some(form.description.trim()).filter(|d| !d.is_empty());

    let composition = match compositions::create_composition(
        &state.db,
        &user.user.guid,
        form.release_type,
        &form.title,
        description,
    )
    .await
    {
        Ok(composition) => composition,
        Err(ragtime_common::Error::InvalidInput(message)) => {
            return compose_page(&headers, &user, Some(&form), Some(&message));
        }
        Err(e) => {
            error!("Failed to create composition: {}", e);
            return compose_page(
                &headers,
                &user,
                Some(&form),
                Some("Something went wrong. Please try again."),
            );
        }
    };

    (
        [(SET_COOKIE, flash_cookie("Published."))],
        Redirect::to(&format!("/composition/{}", composition.slug)),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub bio: String,
}

fn settings_page(headers: &HeaderMap, user: &CurrentUser) -> Response {
    let body = format!(
        "<h1>Profile Settings</h1>\
         <form method=\"post\" action=\"/settings\">\
         <label>Name<input type=\"text\" name=\"name\" value=\"{}\"></label>\
         <label>Location<input type=\"text\" name=\"location\" value=\"{}\"></label>\
         <label>Bio<textarea name=\"bio\" rows=\"4\">{}</textarea></label>\
         <button type=\"submit\">Save</button></form>",
        html_escape(user.user.name.as_deref().unwrap_or("")),
        html_escape(user.user.location.as_deref().unwrap_or("")),
        html_escape(user.user.bio.as_deref().unwrap_or("")),
    );

    render_page("Profile Settings", Some(user), headers, &body).into_response()
}

/// GET /settings - edit the optional profile fields
pub async fn settings_form(user: CurrentUser, headers: HeaderMap) -> Response {
    settings_page(&headers, &user)
}

/// POST /settings
pub async fn settings_submit(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<SettingsForm>,
) -> Response {
    let result = users::update_profile(
        &state.db,
        &user.user.guid,
        Some(form.name.trim()).filter(|v| !v.is_empty()),
        Some(form.location.trim()).filter(|v| !v.is_empty()),
        Some(form.bio.trim()).filter(|v| !v.is_empty()),
    )
    .await;

    if let Err(e) = result {
        error!("Failed to update profile: {}", e);
        return Redirect::to("/settings").into_response();
    }

    (
        [(SET_COOKIE, flash_cookie("Profile updated."))],
        Redirect::to(&format!("/user/{}", user.user.username)),
    )
        .into_response()
}

/// GET /composition/:slug - detail page with paginated comments
pub async fn composition_detail(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(params): Query<PageParam>,
) -> Response {
    let composition = match compositions::find_by_slug(&state.db, &slug).await {
        Ok(Some(composition)) => composition,
        Ok(None) => return not_found(&headers, current.as_ref()),
        Err(e) => {
            error!("Composition lookup failed: {}", e);
            return server_error(&headers, current.as_ref());
        }
    };

    let result: ragtime_common::Result<(Option<User>, String, Pagination)> = async {
        let artist = users::find_by_guid(&state.db, &composition.artist_id).await?;

        let per_page = get_setting_i64(&state.db, "comments_per_page", 30).await?;
        let total = comments::count_for_composition(&state.db, &composition.guid).await?;
        let p = calculate_pagination(total, params.page.unwrap_or(1), per_page);
        let items =
            comments::list_for_composition(&state.db, &composition.guid, p.per_page, p.offset)
                .await?;

        let mut comment_html = String::new();
        for comment in &items {
            let author = users::find_by_guid(&state.db, &comment.artist_id).await?;
            let author_name = author
                .map(|a| a.username)
                .unwrap_or_else(|| "unknown".to_string());
            comment_html.push_str(&format!(
                "<div class=\"comment\"><p class=\"meta\"><a href=\"/user/{0}\">{0}</a> \
                 on {1}</p><p>{2}</p></div>",
                html_escape(&author_name),
                comment.created_at.format("%Y-%m-%d %H:%M"),
                html_escape(&comment.body),
            ));
        }

        Ok((artist, comment_html, p))
    }
    .await;

    let (artist, comment_html, p) = match result {
        Ok(v) => v,
        Err(e) => {
            error!("Composition page query failed: {}", e);
            return server_error(&headers, current.as_ref());
        }
    };

    let release = ReleaseType::from_i64(composition.release_type)
        .map(|r| r.label())
        .unwrap_or("Release");

    let mut body = format!("<h1>{}</h1>", html_escape(&composition.title));
    body.push_str(&format!(
        "<p class=\"meta\">{}{} &middot; {}</p>",
        release,
        artist
            .as_ref()
            .map(|a| format!(" by <a href=\"/user/{0}\">{0}</a>", html_escape(&a.username)))
            .unwrap_or_default(),
        composition.created_at.format("%Y-%m-%d"),
    ));
    if let Some(description) = composition.description.as_deref().filter(|d| !d.is_empty()) {
        body.push_str(&format!("<p>{}</p>", html_escape(description)));
    }

    body.push_str("<h2>Comments</h2>");
    if comment_html.is_empty() {
        body.push_str("<p>No comments yet.</p>");
    } else {
        body.push_str(&comment_html);
        body.push_str(&page_links(
            &format!("/composition/{}", composition.slug),
            &p,
        ));
    }

    match current.as_ref() {
        Some(viewer) if viewer.can(permission::COMMENT) => {
            body.push_str(&format!(
                "<form method=\"post\" action=\"/composition/{}/comments\">\
                 <label>Add a comment<textarea name=\"body\" rows=\"3\" required></textarea></label>\
                 <button type=\"submit\">Comment</button></form>",
                html_escape(&composition.slug)
            ));
        }
        Some(_) => {}
        None => {
            body.push_str("<p><a href=\"/login\">Log in</a> to comment.</p>");
        }
    }

    render_page(&composition.title, current.as_ref(), &headers, &body).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub body: String,
}

/// POST /composition/:slug/comments
pub async fn comment_submit(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let target = format!("/composition/{}", slug);

    if !user.can(permission::COMMENT) {
        return (
            [(SET_COOKIE, flash_cookie("You don't have permission to comment."))],
            Redirect::to(&target),
        )
            .into_response();
    }

    let composition = match compositions::find_by_slug(&state.db, &slug).await {
        Ok(Some(composition)) => composition,
        Ok(None) => return not_found(&headers, Some(&user)),
        Err(e) => {
            error!("Composition lookup failed: {}", e);
            return server_error(&headers, Some(&user));
        }
    };

    match comments::create_comment(&state.db, &composition.guid, &user.user.guid, &form.body).await
    {
        Ok(_) => (
            [(SET_COOKIE, flash_cookie("Comment posted."))],
            Redirect::to(&target),
        )
            .into_response(),
        Err(ragtime_common::Error::InvalidInput(_)) => (
            [(SET_COOKIE, flash_cookie("Comments can't be empty."))],
            Redirect::to(&target),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to create comment: {}", e);
            server_error(&headers, Some(&user))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_composition() -> Composition {
        Composition {
            guid: "g1".to_string(),
            release_type: 2,
            title: "Maple Leaf Rag".to_string(),
            description: None,
            slug: "abc12345-maple-leaf-rag".to_string(),
            artist_id: "u1".to_string(),
            created_at: NaiveDate::from_ymd_opt(1899, 9, 18)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_composition_card_escapes_and_links() {
        let mut composition = sample_composition();
        composition.title = "A <b>bold</b> title".to_string();

        let card = composition_card(&composition, None);
        assert!(card.contains("A &lt;b&gt;bold&lt;/b&gt; title"));
        assert!(card.contains("/composition/abc12345-maple-leaf-rag"));
        assert!(card.contains("EP"));
        assert!(!card.contains("<b>bold</b>"));
    }

    #[test]
    fn test_page_links_bounds() {
        let first = calculate_pagination(100, 1, 20);
        let links = page_links("/", &first);
        assert!(!links.contains("Newer"));
        assert!(links.contains("page=2"));

        let last = calculate_pagination(100, 5, 20);
        let links = page_links("/", &last);
        assert!(links.contains("page=4"));
        assert!(!links.contains("Older"));

        let only = calculate_pagination(5, 1, 20);
        assert!(page_links("/", &only).is_empty());
    }
}

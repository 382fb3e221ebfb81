//! Integration tests for the Ragtime web application
//!
//! Covers the auth flows (register, login, logout, open-redirect guard),
//! the HTML site pages, and the bearer-token JSON API, all against an
//! in-memory database.

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, StatusCode};
use ragtime_common::auth::hash_password;
use ragtime_common::config::{Config, Profile};
use ragtime_common::db::init::init_database_in_memory;
use ragtime_common::db::models::User;
use ragtime_common::db::{sessions, users};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tower::util::ServiceExt; // for `oneshot` method

use ragtime_web::{build_router, AppState};

fn test_config() -> Config {
    Config {
        profile: Profile::Testing,
        secret_key: "test secret".to_string(),
        admin_email: None,
        notify_url: None,
        root_folder: PathBuf::from("/tmp"),
        ssl_redirect: false,
    }
}

/// Test helper: in-memory database plus a router over it
async fn setup() -> (axum::Router, SqlitePool) {
    let pool = init_database_in_memory()
        .await
        .expect("Should create in-memory database");
    let state = AppState::new(pool.clone(), test_config());
    (build_router(state), pool)
}

/// Test helper: create a user directly in the database
async fn seed_user(pool: &SqlitePool, email: &str, username: &str, password: &str) -> User {
    let hash = hash_password(password).expect("Should hash password");
    users::create_user(pool, email, username, &hash, None)
        .await
        .expect("Should create user")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).expect("Body should be UTF-8")
}

async fn body_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Pull the session token out of a login response's Set-Cookie headers
fn session_token(response: &axum::http::Response<Body>) -> Option<String> {
    for value in response.headers().get_all(SET_COOKIE) {
        let raw = value.to_str().ok()?;
        if let Some(rest) = raw.strip_prefix("ragtime_session=") {
            let token = rest.split(';').next()?.to_string();
            if !token.is_empty() {
                return Some(token);
            }
        }
    }
    None
}

fn location(response: &axum::http::Response<Body>) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _pool) = setup().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "ragtime-web");
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_persists_user_and_redirects_to_login() {
    let (app, pool) = setup().await;

    let response = app
        .oneshot(form_post(
            "/register",
            "email=joplin%40example.com&username=scott&password=maple1899&password2=maple1899",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let user = users::find_by_email(&pool, "joplin@example.com")
        .await
        .unwrap()
        .expect("User should exist after registration");
    assert_eq!(user.username, "scott");
    // Password is stored hashed, never verbatim
    assert_ne!(user.password_hash, "maple1899");
}

#[tokio::test]
async fn test_register_rejects_duplicate_email() {
    let (app, pool) = setup().await;
    seed_user(&pool, "joplin@example.com", "scott", "maple1899").await;

    let response = app
        .oneshot(form_post(
            "/register",
            "email=joplin%40example.com&username=other&password=maple1899&password2=maple1899",
        ))
        .await
        .unwrap();

    // Form re-renders with the problem instead of redirecting
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response.into_body()).await;
    assert!(body.contains("Email already registered."));
    assert_eq!(users::count_users(&pool).await.unwrap(), 1);
}

#[tokio::test]
async fn test_register_rejects_mismatched_passwords() {
    let (app, pool) = setup().await;

    let response = app
        .oneshot(form_post(
            "/register",
            "email=a%40b.com&username=scott&password=maple1899&password2=different",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(users::count_users(&pool).await.unwrap(), 0);
}

// =============================================================================
// Login / logout
// =============================================================================

#[tokio::test]
async fn test_login_sets_session_cookie_and_honors_next() {
    let (app, pool) = setup().await;
    seed_user(&pool, "joplin@example.com", "scott", "maple1899").await;

    let response = app
        .oneshot(form_post(
            "/login",
            "email=joplin%40example.com&password=maple1899&next=%2Fuser%2Fscott",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/user/scott");

    let token = session_token(&response).expect("Login should set a session cookie");
    let found = sessions::find_user_by_token(&pool, &token).await.unwrap();
    let (user, _permissions) = found.expect("Session should resolve to the user");
    assert_eq!(user.username, "scott");
}

#[tokio::test]
async fn test_login_rejects_external_redirect_target() {
    let (app, pool) = setup().await;
    seed_user(&pool, "joplin@example.com", "scott", "maple1899").await;

    let response = app
        .oneshot(form_post(
            "/login",
            "email=joplin%40example.com&password=maple1899&next=http%3A%2F%2Fevil.example",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_login_wrong_password_creates_no_session() {
    let (app, pool) = setup().await;
    let user = seed_user(&pool, "joplin@example.com", "scott", "maple1899").await;

    let response = app
        .oneshot(form_post(
            "/login",
            "email=joplin%40example.com&password=wrong-password",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response.into_body()).await;
    assert!(body.contains("Invalid username or password"));

    assert_eq!(
        sessions::live_session_count(&pool, &user.guid).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_logout_deletes_session() {
    let (app, pool) = setup().await;
    seed_user(&pool, "joplin@example.com", "scott", "maple1899").await;

    let login = app
        .clone()
        .oneshot(form_post(
            "/login",
            "email=joplin%40example.com&password=maple1899",
        ))
        .await
        .unwrap();
    let token = session_token(&login).expect("Login should set a session cookie");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/logout")
                .header(COOKIE, format!("ragtime_session={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let found = sessions::find_user_by_token(&pool, &token).await.unwrap();
    assert!(found.is_none(), "Session should be gone after logout");

    // The stale cookie no longer grants access to login-required pages
    let response = app
        .oneshot(
            Request::builder()
                .uri("/compose")
                .header(COOKIE, format!("ragtime_session={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Fcompose");
}

#[tokio::test]
async fn test_login_required_pages_redirect_to_login() {
    let (app, _pool) = setup().await;

    let response = app.oneshot(get("/compose")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    // The path rides along percent-encoded and round-trips through the form
    assert_eq!(location(&response), "/login?next=%2Fcompose");
}

// =============================================================================
// Site pages
// =============================================================================

#[tokio::test]
async fn test_home_lists_published_composition() {
    let (app, pool) = setup().await;
    let artist = seed_user(&pool, "joplin@example.com", "scott", "maple1899").await;
    ragtime_common::db::compositions::create_composition(
        &pool,
        &artist.guid,
        1,
        "Maple Leaf Rag",
        None,
    )
    .await
    .unwrap();

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response.into_body()).await;
    assert!(body.contains("Maple Leaf Rag"));
    assert!(body.contains("/user/scott"));
}

#[tokio::test]
async fn test_profile_shows_follow_counts() {
    let (app, pool) = setup().await;
    let a = seed_user(&pool, "a@example.com", "scott", "maple1899").await;
    let b = seed_user(&pool, "b@example.com", "eubie", "maple1899").await;
    ragtime_common::db::follows::follow(&pool, &a.guid, &b.guid)
        .await
        .unwrap();

    let response = app.oneshot(get("/user/eubie")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response.into_body()).await;
    assert!(body.contains("1 followers"));
}

#[tokio::test]
async fn test_follow_route_records_follow() {
    let (app, pool) = setup().await;
    seed_user(&pool, "a@example.com", "scott", "maple1899").await;
    let b = seed_user(&pool, "b@example.com", "eubie", "maple1899").await;

    let login = app
        .clone()
        .oneshot(form_post("/login", "email=a%40example.com&password=maple1899"))
        .await
        .unwrap();
    let token = session_token(&login).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/follow/eubie")
                .header(COOKIE, format!("ragtime_session={}", token))
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/user/eubie");

    let a = users::find_by_username(&pool, "scott").await.unwrap().unwrap();
    assert!(ragtime_common::db::follows::is_following(&pool, &a.guid, &b.guid)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_unknown_profile_is_404() {
    let (app, _pool) = setup().await;
    let response = app.oneshot(get("/user/nobody")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// JSON API
// =============================================================================

async fn api_token(app: &axum::Router, email: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_post(
            "/api/v1/tokens",
            json!({ "email": email, "password": password }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response.into_body()).await;
    body["token"].as_str().expect("Token in response").to_string()
}

#[tokio::test]
async fn test_token_endpoint_rejects_bad_credentials() {
    let (app, pool) = setup().await;
    seed_user(&pool, "joplin@example.com", "scott", "maple1899").await;

    let response = app
        .oneshot(json_post(
            "/api/v1/tokens",
            json!({ "email": "joplin@example.com", "password": "wrong" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_api_publish_requires_bearer_token() {
    let (app, pool) = setup().await;
    seed_user(&pool, "joplin@example.com", "scott", "maple1899").await;

    let payload = json!({ "title": "Solace", "release_type": 1 });

    // No Authorization header
    let response = app
        .clone()
        .oneshot(json_post("/api/v1/compositions", payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // With a token
    let token = api_token(&app, "joplin@example.com", "maple1899").await;
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/compositions")
                .header(CONTENT_TYPE, "application/json")
                .header(AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["title"], "Solace");
    assert_eq!(body["artist"], "scott");
    assert_eq!(body["release_type"], "single");
    let slug = body["slug"].as_str().unwrap();
    assert!(slug.ends_with("-solace"));
}

#[tokio::test]
async fn test_api_composition_listing_and_detail() {
    let (app, pool) = setup().await;
    let artist = seed_user(&pool, "joplin@example.com", "scott", "maple1899").await;
    let composition = ragtime_common::db::compositions::create_composition(
        &pool,
        &artist.guid,
        3,
        "Treemonisha",
        Some("An opera."),
    )
    .await
    .unwrap();

    let response = app
        .clone()
        .oneshot(get("/api/v1/compositions"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["title"], "Treemonisha");

    let response = app
        .oneshot(get(&format!("/api/v1/compositions/{}", composition.slug)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["release_type"], "album");
    assert_eq!(body["description"], "An opera.");
}

#[tokio::test]
async fn test_api_update_forbidden_for_non_author() {
    let (app, pool) = setup().await;
    let author = seed_user(&pool, "a@example.com", "scott", "maple1899").await;
    seed_user(&pool, "b@example.com", "eubie", "maple1899").await;
    let composition = ragtime_common::db::compositions::create_composition(
        &pool, &author.guid, 1, "Solace", None,
    )
    .await
    .unwrap();

    let token = api_token(&app, "b@example.com", "maple1899").await;
    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/v1/compositions/{}", composition.slug))
                .header(CONTENT_TYPE, "application/json")
                .header(AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(json!({ "title": "Stolen" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_api_timeline_includes_followed_artists() {
    let (app, pool) = setup().await;
    let a = seed_user(&pool, "a@example.com", "scott", "maple1899").await;
    let b = seed_user(&pool, "b@example.com", "eubie", "maple1899").await;
    ragtime_common::db::follows::follow(&pool, &a.guid, &b.guid)
        .await
        .unwrap();
    ragtime_common::db::compositions::create_composition(&pool, &b.guid, 1, "Charleston Rag", None)
        .await
        .unwrap();

    let response = app
        .oneshot(get("/api/v1/users/scott/timeline"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["artist"], "eubie");
}

#[tokio::test]
async fn test_api_comments_flow() {
    let (app, pool) = setup().await;
    let artist = seed_user(&pool, "a@example.com", "scott", "maple1899").await;
    seed_user(&pool, "b@example.com", "eubie", "maple1899").await;
    let composition = ragtime_common::db::compositions::create_composition(
        &pool, &artist.guid, 1, "Solace", None,
    )
    .await
    .unwrap();

    let token = api_token(&app, "b@example.com", "maple1899").await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/compositions/{}/comments", composition.slug))
                .header(CONTENT_TYPE, "application/json")
                .header(AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(json!({ "body": "Beautiful." }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response.into_body()).await;
    assert_eq!(created["author"], "eubie");

    let response = app
        .clone()
        .oneshot(get(&format!(
            "/api/v1/compositions/{}/comments",
            composition.slug
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listing = body_json(response.into_body()).await;
    assert_eq!(listing["total"], 1);
    assert_eq!(listing["items"][0]["body"], "Beautiful.");

    let guid = created["guid"].as_str().unwrap();
    let response = app
        .oneshot(get(&format!("/api/v1/comments/{}", guid)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_comment_moderation_needs_moderate_permission() {
    let pool = init_database_in_memory()
        .await
        .expect("Should create in-memory database");
    // The configured admin email registers with the Administrator role,
    // which carries MODERATE
    let config = Config {
        admin_email: Some("admin@example.com".to_string()),
        ..test_config()
    };
    let app = build_router(AppState::new(pool.clone(), config));

    let hash = hash_password("maple1899").unwrap();
    let admin = users::create_user(&pool, "admin@example.com", "boss", &hash, Some("admin@example.com"))
        .await
        .unwrap();
    let fan = seed_user(&pool, "fan@example.com", "listener", "maple1899").await;

    let composition = ragtime_common::db::compositions::create_composition(
        &pool, &admin.guid, 1, "Solace", None,
    )
    .await
    .unwrap();
    let comment =
        ragtime_common::db::comments::create_comment(&pool, &composition.guid, &fan.guid, "spam")
            .await
            .unwrap();

    // A fan cannot moderate
    let fan_token = api_token(&app, "fan@example.com", "maple1899").await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/comments/{}", comment.guid))
                .header(AUTHORIZATION, format!("Bearer {}", fan_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The admin can
    let admin_token = api_token(&app, "admin@example.com", "maple1899").await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/comments/{}", comment.guid))
                .header(AUTHORIZATION, format!("Bearer {}", admin_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Disabled comments disappear from listings and lookups
    let response = app
        .oneshot(get(&format!("/api/v1/comments/{}", comment.guid)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settings_updates_profile_fields() {
    let (app, pool) = setup().await;
    seed_user(&pool, "joplin@example.com", "scott", "maple1899").await;

    let login = app
        .clone()
        .oneshot(form_post(
            "/login",
            "email=joplin%40example.com&password=maple1899",
        ))
        .await
        .unwrap();
    let token = session_token(&login).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/settings")
                .header(COOKIE, format!("ragtime_session={}", token))
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(
                    "name=Scott+Joplin&location=Sedalia&bio=King+of+ragtime",
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/user/scott");

    let user = users::find_by_username(&pool, "scott").await.unwrap().unwrap();
    assert_eq!(user.name.as_deref(), Some("Scott Joplin"));
    assert_eq!(user.location.as_deref(), Some("Sedalia"));
    assert_eq!(user.bio.as_deref(), Some("King of ragtime"));
}

#[tokio::test]
async fn test_api_user_profile_counts() {
    let (app, pool) = setup().await;
    let a = seed_user(&pool, "a@example.com", "scott", "maple1899").await;
    let b = seed_user(&pool, "b@example.com", "eubie", "maple1899").await;
    ragtime_common::db::follows::follow(&pool, &b.guid, &a.guid)
        .await
        .unwrap();
    ragtime_common::db::compositions::create_composition(&pool, &a.guid, 1, "Solace", None)
        .await
        .unwrap();

    let response = app.oneshot(get("/api/v1/users/scott")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["username"], "scott");
    assert_eq!(body["followers"], 1);
    assert_eq!(body["compositions"], 1);
    // Email never leaves the server
    assert!(body.get("email").is_none());
}

#[tokio::test]
async fn test_api_unknown_resources_are_404() {
    let (app, _pool) = setup().await;

    let response = app
        .clone()
        .oneshot(get("/api/v1/compositions/no-such-slug"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/api/v1/users/nobody")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

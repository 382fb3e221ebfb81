//! Login, logout and registration views

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use ragtime_common::auth::{hash_password, verify_password};
use ragtime_common::db::users;
use serde::Deserialize;
use tracing::{error, info};

use crate::auth::forms::{LoginForm, RegistrationForm};
use crate::flash::flash_cookie;
use crate::notify;
use crate::session::{self, cookie_value, issue_session, MaybeUser};
use crate::templates::{html_escape, render_page, LOGIN_FORM, REGISTER_FORM};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NextParam {
    #[serde(default)]
    pub next: Option<String>,
}

/// Open-redirect guard: only relative paths may be used as a post-login
/// target. Protocol-relative URLs (`//evil.example`) are not local either.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

fn login_page(headers: &HeaderMap, next: Option<&str>, email: &str, error: Option<&str>) -> Response {
    let form = LOGIN_FORM
        .replace("{{NEXT}}", &html_escape(safe_next(next)))
        .replace("{{EMAIL}}", &html_escape(email));

    let body = match error {
        Some(message) => format!("<div class=\"flash\">{}</div>{}", html_escape(message), form),
        None => form,
    };

    render_page("Log In", None, headers, &body).into_response()
}

/// GET /login
pub async fn login_form(headers: HeaderMap, Query(params): Query<NextParam>) -> Response {
    login_page(&headers, params.next.as_deref(), "", None)
}

/// POST /login
///
/// On valid credentials establishes a session (with optional "remember me"
/// persistence) and redirects to the safe next-URL. On invalid credentials
/// re-renders the form with an error; no session is created.
pub async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let user = match users::find_by_email(&state.db, &form.email).await {
        Ok(user) => user,
        Err(e) => {
            error!("Login lookup failed: {}", e);
            return login_page(&headers, form.next.as_deref(), &form.email, Some("Something went wrong. Please try again."));
        }
    };

    let verified = user
        .as_ref()
        .is_some_and(|u| verify_password(&form.password, &u.password_hash));

    let Some(user) = user.filter(|_| verified) else {
        info!("Failed login attempt for {}", form.email);
        return login_page(
            &headers,
            form.next.as_deref(),
            &form.email,
            Some("Invalid username or password"),
        );
    };

    let cookie = match issue_session(&state, &user, form.remember()).await {
        Ok(cookie) => cookie,
        Err(e) => {
            error!("Failed to create session for {}: {}", user.username, e);
            return login_page(&headers, form.next.as_deref(), &form.email, Some("Something went wrong. Please try again."));
        }
    };

    info!("User {} logged in", user.username);
    let target = safe_next(form.next.as_deref()).to_string();
    ([(SET_COOKIE, cookie)], Redirect::to(&target)).into_response()
}

/// GET /logout
///
/// Clears the session and redirects home with a confirmation message.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = cookie_value(&headers, session::SESSION_COOKIE) {
        if let Err(e) = ragtime_common::db::sessions::delete_by_token(&state.db, &token).await {
            error!("Failed to delete session: {}", e);
        }
    }

    (
        [
            (SET_COOKIE, session::clear_session_cookie()),
            (SET_COOKIE, flash_cookie("You've been logged out.")),
        ],
        Redirect::to("/"),
    )
        .into_response()
}

fn register_page(headers: &HeaderMap, form: Option<&RegistrationForm>, error: Option<&str>) -> Response {
    let error_html = match error {
        Some(message) => format!("<p class=\"error\">{}</p>", html_escape(message)),
        None => String::new(),
    };

    let body = REGISTER_FORM
        .replace("{{ERROR}}", &error_html)
        .replace("{{EMAIL}}", &html_escape(form.map(|f| f.email.as_str()).unwrap_or("")))
        .replace("{{USERNAME}}", &html_escape(form.map(|f| f.username.as_str()).unwrap_or("")));

    render_page("Register", None, headers, &body).into_response()
}

/// GET /register
pub async fn register_form(headers: HeaderMap) -> Response {
    register_page(&headers, None, None)
}

/// POST /register
///
/// Validates the form, persists the new user and redirects to login. The
/// admin contact is notified of the new account when configured.
pub async fn register_submit(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    headers: HeaderMap,
    Form(form): Form<RegistrationForm>,
) -> Response {
    if maybe_user.0.is_some() {
        return Redirect::to("/").into_response();
    }

    if let Err(message) = form.validate() {
        return register_page(&headers, Some(&form), Some(&message));
    }

    // Uniqueness pre-checks give friendlier messages than the constraint
    // violation, which still backstops races
    match users::find_by_email(&state.db, &form.email).await {
        Ok(Some(_)) => return register_page(&headers, Some(&form), Some("Email already registered.")),
        Ok(None) => {}
        Err(e) => {
            error!("Registration lookup failed: {}", e);
            return register_page(&headers, Some(&form), Some("Something went wrong. Please try again."));
        }
    }
    match users::find_by_username(&state.db, &form.username).await {
        Ok(Some(_)) => return register_page(&headers, Some(&form), Some("Username already in use.")),
        Ok(None) => {}
        Err(e) => {
            error!("Registration lookup failed: {}", e);
            return register_page(&headers, Some(&form), Some("Something went wrong. Please try again."));
        }
    }

    let password_hash = match hash_password(&form.password) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Password hashing failed: {}", e);
            return register_page(&headers, Some(&form), Some("Something went wrong. Please try again."));
        }
    };

    let user = match users::create_user(
        &state.db,
        &form.email,
        &form.username,
        &password_hash,
        state.config.admin_email.as_deref(),
    )
    .await
    {
        Ok(user) => user,
        Err(e) if matches!(e, ragtime_common::Error::Conflict(_)) => {
            return register_page(&headers, Some(&form), Some("Email or username already registered."));
        }
        Err(e) => {
            error!("Failed to create user: {}", e);
            return register_page(&headers, Some(&form), Some("Something went wrong. Please try again."));
        }
    };

    info!("Registered new user {}", user.username);

    // Form input is valid (not an existing user, etc), so let the admin know
    notify::notify_new_user(&state.config, &user.username, &user.email).await;

    (
        [(SET_COOKIE, flash_cookie("Coolio. Now you can login."))],
        Redirect::to("/login"),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_allows_relative_paths() {
        assert_eq!(safe_next(Some("/compose")), "/compose");
        assert_eq!(safe_next(Some("/user/scott")), "/user/scott");
    }

    #[test]
    fn test_safe_next_rejects_external_urls() {
        assert_eq!(safe_next(Some("http://evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example/x")), "/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("javascript:alert(1)")), "/");
        assert_eq!(safe_next(Some("")), "/");
        assert_eq!(safe_next(None), "/");
    }
}

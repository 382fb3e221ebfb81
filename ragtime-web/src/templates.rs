//! Embedded HTML templates
//!
//! Pages are served from HTML embedded at compile time with placeholder
//! replacement; no template engine dependency.

use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};

use crate::flash::{clear_flash_cookie, take_flash};
use crate::session::CurrentUser;

const BASE: &str = include_str!("templates/base.html");
pub const LOGIN_FORM: &str = include_str!("templates/login.html");
pub const REGISTER_FORM: &str = include_str!("templates/register.html");
pub const COMPOSE_FORM: &str = include_str!("templates/compose.html");

/// Escape text for interpolation into HTML
pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a page into the base layout
///
/// The nav reflects login state, and a pending flash message (one-time
/// cookie) is shown once; displaying it also clears its cookie. `body` is
/// trusted HTML assembled by the caller; anything user-authored inside it
/// must already be escaped.
pub fn render_page(
    title: &str,
    user: Option<&CurrentUser>,
    request_headers: &HeaderMap,
    body: &str,
) -> Response {
    let nav = match user {
        Some(current) => {
            let mut nav = String::new();
            if current.can(ragtime_common::db::models::permission::WRITE) {
                nav.push_str("<a href=\"/compose\">Compose</a>");
            }
            nav.push_str(&format!(
                "<a href=\"/user/{0}\">{0}</a><a href=\"/settings\">Settings</a><a href=\"/logout\">Log Out</a>",
                html_escape(&current.user.username)
            ));
            nav
        }
        None => "<a href=\"/login\">Log In</a><a href=\"/register\">Register</a>".to_string(),
    };

    let flash = take_flash(request_headers);
    let flash_html = match flash.as_deref() {
        Some(message) => format!("<div class=\"flash\">{}</div>", html_escape(message)),
        None => String::new(),
    };

    let page = BASE
        .replace("{{TITLE}}", &html_escape(title))
        .replace("{{NAV}}", &nav)
        .replace("{{FLASH}}", &flash_html)
        .replace("{{CONTENT}}", body);

    if flash.is_some() {
        ([(SET_COOKIE, clear_flash_cookie())], Html(page)).into_response()
    } else {
        Html(page).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(
            html_escape("<script>\"x\"</script>"),
            "&lt;script&gt;&quot;x&quot;&lt;/script&gt;"
        );
        assert_eq!(html_escape("plain"), "plain");
    }

    #[tokio::test]
    async fn test_render_page_anonymous_nav() {
        let headers = HeaderMap::new();
        let response = render_page("Home", None, &headers, "<p>hello</p>");
        // No flash shown, so nothing to clear
        assert!(response.headers().get(SET_COOKIE).is_none());

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(page.contains("<p>hello</p>"));
        assert!(page.contains("/login"));
        assert!(page.contains("/register"));
        assert!(!page.contains("Log Out"));
    }

    #[tokio::test]
    async fn test_render_page_shows_and_clears_flash() {
        let mut headers = HeaderMap::new();
        let cookie = crate::flash::flash_cookie("Coolio. Now you can login.");
        headers.insert(
            axum::http::header::COOKIE,
            cookie.split(';').next().unwrap().parse().unwrap(),
        );

        let response = render_page("Home", None, &headers, "");
        let cleared = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(cleared.contains("Max-Age=0"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains("Coolio. Now you can login."));
    }
}

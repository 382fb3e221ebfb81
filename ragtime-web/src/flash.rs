//! One-time flash messages
//!
//! A flash is queued as a short-lived cookie on a redirect and consumed by
//! the next rendered page. The value is percent-encoded so arbitrary
//! message text survives the cookie header.

use axum::http::HeaderMap;

use crate::session::cookie_value;

/// Name of the flash cookie
pub const FLASH_COOKIE: &str = "ragtime_flash";

/// Build the Set-Cookie value queuing a flash message for the next page
pub fn flash_cookie(message: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age=60",
        FLASH_COOKIE,
        percent_encode(message)
    )
}

/// Build the Set-Cookie value consuming the flash cookie
pub fn clear_flash_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", FLASH_COOKIE)
}

/// Read the pending flash message, if any
pub fn take_flash(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, FLASH_COOKIE).map(|v| percent_decode(&v))
}

/// Minimal percent-encoding: everything outside [A-Za-z0-9._~-] is `%XX`
///
/// Cookie values cannot carry spaces, quotes or semicolons, so the message
/// is encoded rather than constrained. Also strict enough for URL query
/// parameter values.
pub(crate) fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'~' | b'-' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (hex_val(bytes.get(i + 1)), hex_val(bytes.get(i + 2))) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(byte: Option<&u8>) -> Option<u8> {
    match byte? {
        b @ b'0'..=b'9' => Some(b - b'0'),
        b @ b'a'..=b'f' => Some(b - b'a' + 10),
        b @ b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

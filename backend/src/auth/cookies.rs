//! Construction and parsing of the authentication cookies.
//!
//! Both cookies are site-wide, `HttpOnly` and `SameSite=Strict`, and carry
//! `Secure` when the request that produced them arrived over TLS.

use crate::auth::remember_me::RememberMeCredential;
use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};
use chrono::{DateTime, Utc};

pub const SESSION_COOKIE_NAME: &str = "ELEARN_SESSION";
pub const REMEMBER_ME_COOKIE_NAME: &str = "remember-me";

/// Session cookie without `Max-Age`: it lives as long as the browser session.
pub fn session_cookie(session_id: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}={session_id}; Path=/; HttpOnly; SameSite=Strict");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Remember-me cookie expiring at the same instant as the stored token.
pub fn remember_me_cookie(
    credential: &RememberMeCredential,
    now: DateTime<Utc>,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = (credential.expires_at - now).num_seconds().max(0);
    let expires = credential.expires_at.format("%a, %d %b %Y %H:%M:%S GMT");
    let mut cookie = format!(
        "{REMEMBER_ME_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age}; Expires={expires}",
        credential.cookie_value()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Immediately-expired cookie that makes the browser drop `name`.
pub fn clear_cookie(name: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{name}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Reads a cookie value from every `Cookie` header of the request.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

//! Session cookies.
//!
//! Both tokens travel as `HttpOnly; Secure` cookies. Neither flag is
//! configurable: scripts never read the tokens and they never cross an
//! unencrypted channel.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};

use crate::auth::jwt::{TokenConfig, TokenPair};
use crate::error::AppError;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

const CLEARED_ACCESS_COOKIE: &str = "accessToken=; Path=/; HttpOnly; Secure; Max-Age=0";
const CLEARED_REFRESH_COOKIE: &str = "refreshToken=; Path=/; HttpOnly; Secure; Max-Age=0";

/// Build a `Set-Cookie` value for a session token.
pub fn session_cookie(name: &str, token: &str, max_age_secs: i64) -> Result<HeaderValue, AppError> {
    let cookie = format!("{name}={token}; Path=/; HttpOnly; Secure; Max-Age={max_age_secs}");
    HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::InternalError(format!("Invalid cookie value: {e}")))
}

/// Headers setting both session cookies, each expiring with its token.
pub fn session_cookie_headers(
    tokens: &TokenPair,
    config: &TokenConfig,
) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        session_cookie(ACCESS_TOKEN_COOKIE, &tokens.access_token, config.access_ttl_secs())?,
    );
    headers.append(
        SET_COOKIE,
        session_cookie(
            REFRESH_TOKEN_COOKIE,
            &tokens.refresh_token,
            config.refresh_ttl_secs(),
        )?,
    );
    Ok(headers)
}

/// Headers deleting both session cookies.
pub fn cleared_cookie_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, HeaderValue::from_static(CLEARED_ACCESS_COOKIE));
    headers.append(SET_COOKIE, HeaderValue::from_static(CLEARED_REFRESH_COOKIE));
    headers
}

/// Read a cookie from the request `Cookie` header(s).
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

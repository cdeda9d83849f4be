// `dp_auth_{document}` cookie handling.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

use super::jwt::DOCUMENT_TOKEN_TTL_SECONDS;

const COOKIE_PREFIX: &str = "dp_auth_";

pub fn cookie_name(document_id: &str) -> String {
    format!("{COOKIE_PREFIX}{document_id}")
}

pub fn access_cookie(document_id: &str, token: &str, secure: bool) -> String {
    build(document_id, token, DOCUMENT_TOKEN_TTL_SECONDS, secure)
}

/// Expires the cookie immediately.
pub fn clear_cookie(document_id: &str, secure: bool) -> String {
    build(document_id, "", 0, secure)
}

fn build(document_id: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={value}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Strict",
        cookie_name(document_id)
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Value of the document's access cookie, if the request carries one.
pub fn read_token(headers: &HeaderMap, document_id: &str) -> Option<String> {
    let name = cookie_name(document_id);
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

//! Session cookie codec.
//!
//! Two families of cookies carry the provider session:
//!
//! - **Legacy**: `sb-access-token` and `sb-refresh-token`, `HttpOnly`, 30 days.
//!   Written by the internal API after verification or refresh.
//! - **Combined**: `sb-<project-ref>-auth-token`, the whole session as JSON,
//!   written as `base64-<base64url(json)>` and split into `.0`, `.1`, ...
//!   chunks once it exceeds [`MAX_CHUNK_SIZE`]. Readers also accept raw JSON
//!   objects and the older `[access, refresh, ...]` array form.

use crate::provider::Session;
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64ct::{Base64, Base64UrlUnpadded, Encoding};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";

pub const LEGACY_MAX_AGE_SECONDS: u64 = 60 * 60 * 24 * 30;
pub const SESSION_MAX_AGE_SECONDS: u64 = 60 * 60 * 24 * 400;
pub const CODE_VERIFIER_MAX_AGE_SECONDS: u64 = 60 * 10;

/// Largest value written into a single combined cookie.
pub const MAX_CHUNK_SIZE: usize = 3180;

const BASE64_PREFIX: &str = "base64-";
const SESSION_COOKIE_PATTERN: &str = r"^sb-[A-Za-z0-9-]+-auth-token(\.\d+)?$";

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid cookie header: {0}")]
    Header(#[from] InvalidHeaderValue),
}

#[must_use]
pub fn session_cookie_name(project_ref: &str) -> String {
    format!("sb-{project_ref}-auth-token")
}

#[must_use]
pub fn code_verifier_cookie_name(project_ref: &str) -> String {
    format!("sb-{project_ref}-auth-token-code-verifier")
}

fn session_cookie_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SESSION_COOKIE_PATTERN).ok())
        .as_ref()
}

/// True for `sb-<ref>-auth-token` and its numbered chunks.
#[must_use]
pub fn is_session_cookie(name: &str) -> bool {
    session_cookie_regex().is_some_and(|re| re.is_match(name))
}

/// Name without the `.N` chunk suffix.
fn base_name(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((base, index)) if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) => {
            base
        }
        _ => name,
    }
}

/// All `name=value` pairs from every `Cookie` header, in order.
#[must_use]
pub fn parse_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    let mut cookies = Vec::new();
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let key = key.trim();
            if !key.is_empty() {
                cookies.push((key.to_string(), val.trim().to_string()));
            }
        }
    }
    cookies
}

#[must_use]
pub fn cookie_value<'a>(cookies: &'a [(String, String)], name: &str) -> Option<&'a str> {
    cookies
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
        .filter(|value| !value.is_empty())
}

/// Read the combined session stored under `name`, joining chunks when needed.
#[must_use]
pub fn read_session(cookies: &[(String, String)], name: &str) -> Option<Session> {
    if let Some(raw) = cookie_value(cookies, name) {
        return decode_session(raw);
    }

    let mut joined = String::new();
    for index in 0.. {
        match cookie_value(cookies, &format!("{name}.{index}")) {
            Some(chunk) => joined.push_str(chunk),
            None => break,
        }
    }

    if joined.is_empty() {
        None
    } else {
        decode_session(&joined)
    }
}

/// Read the first decodable combined session, whatever its project ref.
#[must_use]
pub fn read_any_session(cookies: &[(String, String)]) -> Option<Session> {
    let mut seen: Vec<&str> = Vec::new();
    for (name, _) in cookies {
        if !is_session_cookie(name) {
            continue;
        }
        let base = base_name(name);
        if seen.contains(&base) {
            continue;
        }
        seen.push(base);
        if let Some(session) = read_session(cookies, base) {
            return Some(session);
        }
    }
    None
}

/// Decode a combined cookie value into a session.
#[must_use]
pub fn decode_session(raw: &str) -> Option<Session> {
    let raw = raw.trim();

    let json = if let Some(encoded) = raw.strip_prefix(BASE64_PREFIX) {
        let encoded = encoded.trim_end_matches('=');
        let bytes = Base64UrlUnpadded::decode_vec(encoded)
            .or_else(|_| Base64::decode_vec(raw.trim_start_matches(BASE64_PREFIX)))
            .ok()?;
        String::from_utf8(bytes).ok()?
    } else if raw.starts_with('%') {
        percent_decode(raw)?
    } else {
        raw.to_string()
    };

    let session = match serde_json::from_str::<Value>(&json).ok()? {
        Value::Array(items) => {
            let access = items.first().and_then(Value::as_str)?;
            let refresh = items.get(1).and_then(Value::as_str).unwrap_or_default();
            Some(Session::new(access, refresh))
        }
        value @ Value::Object(_) => serde_json::from_value::<Session>(value).ok(),
        _ => None,
    }?;

    if session.access_token.is_empty() {
        None
    } else {
        Some(session)
    }
}

// Older helpers stored URI-encoded JSON. No `&` or `=` survive encoding, so the
// whole value comes back as the first form key.
fn percent_decode(raw: &str) -> Option<String> {
    url::form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
}

/// # Errors
/// Returns an error if the session cannot be serialized.
pub fn encode_session(session: &Session) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(session)?;
    Ok(format!(
        "{BASE64_PREFIX}{}",
        Base64UrlUnpadded::encode_string(json.as_bytes())
    ))
}

fn build_cookie(
    name: &str,
    value: &str,
    max_age: u64,
    http_only: bool,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{name}={value}; Path=/");
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    cookie.push_str(&format!("; SameSite=Lax; Max-Age={max_age}"));
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// `Set-Cookie` values for the discrete access/refresh cookies.
///
/// # Errors
/// Returns an error if a token contains characters invalid in a header.
pub fn legacy_cookies(
    session: &Session,
    secure: bool,
) -> Result<Vec<HeaderValue>, InvalidHeaderValue> {
    Ok(vec![
        build_cookie(
            ACCESS_TOKEN_COOKIE,
            &session.access_token,
            LEGACY_MAX_AGE_SECONDS,
            true,
            secure,
        )?,
        build_cookie(
            REFRESH_TOKEN_COOKIE,
            &session.refresh_token,
            LEGACY_MAX_AGE_SECONDS,
            true,
            secure,
        )?,
    ])
}

/// # Errors
/// Never fails for the fixed cookie names; kept fallible like the other builders.
pub fn clear_legacy_cookies(secure: bool) -> Result<Vec<HeaderValue>, InvalidHeaderValue> {
    Ok(vec![
        build_cookie(ACCESS_TOKEN_COOKIE, "", 0, true, secure)?,
        build_cookie(REFRESH_TOKEN_COOKIE, "", 0, true, secure)?,
    ])
}

fn chunk_value(value: &str) -> Vec<String> {
    value
        .chars()
        .collect::<Vec<_>>()
        .chunks(MAX_CHUNK_SIZE)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// `Set-Cookie` values that store `session` in the combined cookie, chunked if
/// needed. Chunks left over from `existing` request cookies are expired.
///
/// # Errors
/// Returns an error if the session cannot be encoded.
pub fn session_cookies(
    project_ref: &str,
    session: &Session,
    existing: &[(String, String)],
    secure: bool,
) -> Result<Vec<HeaderValue>, CookieError> {
    let name = session_cookie_name(project_ref);
    let encoded = encode_session(session)?;

    let mut written: Vec<String> = Vec::new();
    let mut cookies = Vec::new();

    if encoded.len() <= MAX_CHUNK_SIZE {
        cookies.push(build_cookie(
            &name,
            &encoded,
            SESSION_MAX_AGE_SECONDS,
            false,
            secure,
        )?);
        written.push(name.clone());
    } else {
        for (index, chunk) in chunk_value(&encoded).iter().enumerate() {
            let chunk_name = format!("{name}.{index}");
            cookies.push(build_cookie(
                &chunk_name,
                chunk,
                SESSION_MAX_AGE_SECONDS,
                false,
                secure,
            )?);
            written.push(chunk_name);
        }
    }

    for (existing_name, _) in existing {
        if base_name(existing_name) == name && !written.contains(existing_name) {
            cookies.push(build_cookie(existing_name, "", 0, false, secure)?);
            written.push(existing_name.clone());
        }
    }

    Ok(cookies)
}

/// Expire the combined cookie and every chunk present in the request.
///
/// # Errors
/// Returns an error if a cookie name is not a valid header value.
pub fn clear_session_cookies(
    project_ref: &str,
    existing: &[(String, String)],
    secure: bool,
) -> Result<Vec<HeaderValue>, InvalidHeaderValue> {
    let name = session_cookie_name(project_ref);
    let mut cleared = vec![name.clone()];
    for (existing_name, _) in existing {
        if base_name(existing_name) == name && !cleared.contains(existing_name) {
            cleared.push(existing_name.clone());
        }
    }

    cleared
        .iter()
        .map(|cookie| build_cookie(cookie, "", 0, false, secure))
        .collect()
}

/// # Errors
/// Returns an error if the verifier is not a valid header value.
pub fn code_verifier_cookie(
    project_ref: &str,
    verifier: &str,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    build_cookie(
        &code_verifier_cookie_name(project_ref),
        verifier,
        CODE_VERIFIER_MAX_AGE_SECONDS,
        true,
        secure,
    )
}

/// # Errors
/// Returns an error if the cookie name is not a valid header value.
pub fn clear_code_verifier_cookie(
    project_ref: &str,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    build_cookie(&code_verifier_cookie_name(project_ref), "", 0, true, secure)
}

/// Replace the combined session in the request's `Cookie` header so handlers
/// further down see what the response is about to store.
pub fn rewrite_request_session(
    headers: &mut HeaderMap,
    project_ref: &str,
    encoded: Option<&str>,
) {
    let name = session_cookie_name(project_ref);

    let mut pairs: Vec<String> = parse_cookies(headers)
        .into_iter()
        .filter(|(key, _)| base_name(key) != name)
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    if let Some(encoded) = encoded {
        pairs.push(format!("{name}={encoded}"));
    }

    headers.remove(COOKIE);
    if pairs.is_empty() {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&pairs.join("; ")) {
        headers.insert(COOKIE, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    fn session() -> Session {
        let mut session = Session::new("access-1", "refresh-1");
        session.expires_at = Some(1_900_000_000);
        session
    }

    fn set_cookie_str(value: &HeaderValue) -> &str {
        value.to_str().unwrap()
    }

    #[test]
    fn session_cookie_pattern() {
        assert!(is_session_cookie("sb-abcd-auth-token"));
        assert!(is_session_cookie("sb-my-project-auth-token.0"));
        assert!(is_session_cookie("sb-abcd-auth-token.12"));
        assert!(!is_session_cookie("sb-access-token"));
        assert!(!is_session_cookie("sb-abcd-auth-token-code-verifier"));
        assert!(!is_session_cookie("sb-abcd-auth-token.x"));
    }

    #[test]
    fn parse_cookies_splits_pairs() {
        let headers = headers_with_cookie("a=1; b = two ;broken; c=x=y");
        let cookies = parse_cookies(&headers);
        assert_eq!(cookie_value(&cookies, "a"), Some("1"));
        assert_eq!(cookie_value(&cookies, "b"), Some("two"));
        assert_eq!(cookie_value(&cookies, "c"), Some("x=y"));
        assert_eq!(cookie_value(&cookies, "broken"), None);
    }

    #[test]
    fn encoded_session_decodes_back() {
        let encoded = encode_session(&session()).unwrap();
        assert!(encoded.starts_with("base64-"));
        assert_eq!(decode_session(&encoded), Some(session()));
    }

    #[test]
    fn decode_accepts_raw_json_and_array_forms() {
        let raw = r#"{"access_token":"a","refresh_token":"r","expires_at":5}"#;
        let decoded = decode_session(raw).unwrap();
        assert_eq!(decoded.access_token, "a");
        assert_eq!(decoded.expires_at, Some(5));

        let array = r#"["a2","r2",null,null,null]"#;
        let decoded = decode_session(array).unwrap();
        assert_eq!(decoded.access_token, "a2");
        assert_eq!(decoded.refresh_token, "r2");

        let encoded = "%7B%22access_token%22%3A%22a3%22%2C%22refresh_token%22%3A%22r3%22%7D";
        assert_eq!(decode_session(encoded).unwrap().access_token, "a3");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(decode_session("base64-!!!"), None);
        assert_eq!(decode_session("not json"), None);
        assert_eq!(decode_session(r#"{"access_token":""}"#), None);
        assert_eq!(decode_session("42"), None);
    }

    #[test]
    fn chunked_session_is_joined_in_order() {
        let encoded = encode_session(&session()).unwrap();
        let (first, second) = encoded.split_at(10);
        let headers = headers_with_cookie(&format!(
            "sb-proj-auth-token.1={second}; other=1; sb-proj-auth-token.0={first}"
        ));
        let cookies = parse_cookies(&headers);
        assert_eq!(read_session(&cookies, "sb-proj-auth-token"), Some(session()));
        assert_eq!(read_any_session(&cookies), Some(session()));
    }

    #[test]
    fn read_any_session_skips_undecodable_entries() {
        let encoded = encode_session(&session()).unwrap();
        let headers =
            headers_with_cookie(&format!("sb-old-auth-token=junk; sb-new-auth-token={encoded}"));
        let cookies = parse_cookies(&headers);
        assert_eq!(read_any_session(&cookies), Some(session()));
    }

    #[test]
    fn legacy_cookie_attributes() {
        let cookies = legacy_cookies(&session(), false).unwrap();
        assert_eq!(
            set_cookie_str(&cookies[0]),
            "sb-access-token=access-1; Path=/; HttpOnly; SameSite=Lax; Max-Age=2592000"
        );
        assert_eq!(
            set_cookie_str(&cookies[1]),
            "sb-refresh-token=refresh-1; Path=/; HttpOnly; SameSite=Lax; Max-Age=2592000"
        );

        let secure = legacy_cookies(&session(), true).unwrap();
        assert!(set_cookie_str(&secure[0]).ends_with("; Secure"));

        let cleared = clear_legacy_cookies(false).unwrap();
        assert!(set_cookie_str(&cleared[0]).starts_with("sb-access-token=;"));
        assert!(set_cookie_str(&cleared[1]).contains("Max-Age=0"));
    }

    #[test]
    fn small_session_is_one_cookie_and_expires_old_chunks() {
        let existing = vec![
            ("sb-proj-auth-token.0".to_string(), "x".to_string()),
            ("sb-proj-auth-token.1".to_string(), "y".to_string()),
        ];
        let cookies = session_cookies("proj", &session(), &existing, false).unwrap();
        assert_eq!(cookies.len(), 3);
        assert!(set_cookie_str(&cookies[0]).starts_with("sb-proj-auth-token=base64-"));
        assert!(!set_cookie_str(&cookies[0]).contains("HttpOnly"));
        assert!(set_cookie_str(&cookies[1]).starts_with("sb-proj-auth-token.0=;"));
        assert!(set_cookie_str(&cookies[2]).starts_with("sb-proj-auth-token.1=;"));
    }

    #[test]
    fn large_session_is_chunked() {
        let mut large = session();
        large.access_token = "a".repeat(MAX_CHUNK_SIZE * 2);
        let cookies = session_cookies("proj", &large, &[], false).unwrap();
        assert!(cookies.len() >= 3);
        assert!(set_cookie_str(&cookies[0]).starts_with("sb-proj-auth-token.0="));
        assert!(set_cookie_str(&cookies[2]).starts_with("sb-proj-auth-token.2="));

        let request: Vec<(String, String)> = cookies
            .iter()
            .map(|cookie| {
                let pair = set_cookie_str(cookie).split(';').next().unwrap();
                let (name, value) = pair.split_once('=').unwrap();
                (name.to_string(), value.to_string())
            })
            .collect();
        assert_eq!(read_session(&request, "sb-proj-auth-token"), Some(large));
    }

    #[test]
    fn clear_session_cookies_covers_chunks() {
        let existing = vec![("sb-proj-auth-token.0".to_string(), "x".to_string())];
        let cleared = clear_session_cookies("proj", &existing, true).unwrap();
        assert_eq!(cleared.len(), 2);
        assert!(set_cookie_str(&cleared[0]).starts_with("sb-proj-auth-token=;"));
        assert!(set_cookie_str(&cleared[1]).starts_with("sb-proj-auth-token.0=;"));
        assert!(set_cookie_str(&cleared[1]).ends_with("Max-Age=0; Secure"));
    }

    #[test]
    fn code_verifier_cookie_is_short_lived() {
        let cookie = code_verifier_cookie("proj", "verifier", false).unwrap();
        assert_eq!(
            set_cookie_str(&cookie),
            "sb-proj-auth-token-code-verifier=verifier; Path=/; HttpOnly; SameSite=Lax; Max-Age=600"
        );
        let cleared = clear_code_verifier_cookie("proj", false).unwrap();
        assert!(set_cookie_str(&cleared).contains("Max-Age=0"));
    }

    #[test]
    fn rewrite_request_session_replaces_chunks() {
        let mut headers =
            headers_with_cookie("theme=dark; sb-proj-auth-token.0=aaa; sb-proj-auth-token.1=bbb");
        rewrite_request_session(&mut headers, "proj", Some("base64-new"));
        let cookies = parse_cookies(&headers);
        assert_eq!(cookie_value(&cookies, "theme"), Some("dark"));
        assert_eq!(cookie_value(&cookies, "sb-proj-auth-token"), Some("base64-new"));
        assert_eq!(cookie_value(&cookies, "sb-proj-auth-token.0"), None);

        rewrite_request_session(&mut headers, "proj", None);
        let cookies = parse_cookies(&headers);
        assert_eq!(cookies.len(), 1);
    }
}

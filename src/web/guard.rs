//! Navigation guard.
//!
//! Flow Overview: every navigation (static assets and `/api/` excluded) reads
//! the combined session cookie, refreshes it when the access token is expired
//! or rejected, then applies the redirect rules in [`super::redirect`]. Fresh
//! cookies are written to the response and into the request, so the handler
//! behind the guard sees the refreshed session. Provider outages fail open: the
//! request passes through untouched.

use super::{redirect::guard_target, WebState};
use crate::{
    provider::{unix_now, ProviderError, Session, User},
    server::prepend_cookies,
    session::cookies::{
        clear_session_cookies, encode_session, parse_cookies, read_session,
        rewrite_request_session, session_cookie_name, session_cookies,
    },
};
use axum::{
    extract::{Extension, Request},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Refresh this many seconds before the provider's expiry.
pub const EXPIRY_LEEWAY_SECONDS: i64 = 10;

const EXCLUDED_PREFIXES: [&str; 4] = ["/_next/static", "/_next/image", "/favicon.ico", "/api/"];

#[must_use]
pub fn is_excluded(path: &str) -> bool {
    EXCLUDED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

#[derive(Debug)]
pub enum SessionCheck {
    Anonymous,
    Valid { user: User, session: Session },
    Refreshed { user: User, session: Session },
    /// A session cookie was present but the provider refused it and its refresh token.
    Rejected,
    Unavailable(ProviderError),
}

pub async fn check_session(state: &WebState, headers: &HeaderMap) -> SessionCheck {
    let provider = state.provider();
    let cookies = parse_cookies(headers);
    let Some(session) = read_session(&cookies, &session_cookie_name(provider.project_ref()))
    else {
        return SessionCheck::Anonymous;
    };

    if !session.is_expired(unix_now(), EXPIRY_LEEWAY_SECONDS) {
        match provider.get_user(&session.access_token).await {
            Ok(user) => return SessionCheck::Valid { user, session },
            Err(err) if err.is_rejection() => debug!("Session access token rejected: {err}"),
            Err(err) => return SessionCheck::Unavailable(err),
        }
    }

    if !session.has_refresh_token() {
        return SessionCheck::Rejected;
    }

    let refreshed = match provider.refresh_session(&session.refresh_token).await {
        Ok(refreshed) => refreshed,
        Err(err) if err.is_rejection() => {
            info!("Session refresh rejected: {err}");
            return SessionCheck::Rejected;
        }
        Err(err) => return SessionCheck::Unavailable(err),
    };

    match refreshed.user.clone() {
        Some(user) => SessionCheck::Refreshed {
            user,
            session: refreshed,
        },
        None => match provider.get_user(&refreshed.access_token).await {
            Ok(user) => SessionCheck::Refreshed {
                user,
                session: refreshed,
            },
            Err(err) if err.is_rejection() => SessionCheck::Rejected,
            Err(err) => SessionCheck::Unavailable(err),
        },
    }
}

/// Cookies that store a refreshed session, or clear a rejected one.
pub fn refreshed_cookies(
    state: &WebState,
    headers: &HeaderMap,
    session: Option<&Session>,
) -> Vec<HeaderValue> {
    let project_ref = state.provider().project_ref();
    let cookies = parse_cookies(headers);
    let result = match session {
        Some(session) => session_cookies(project_ref, session, &cookies, state.secure_cookies())
            .map_err(|err| err.to_string()),
        None => clear_session_cookies(project_ref, &cookies, state.secure_cookies())
            .map_err(|err| err.to_string()),
    };
    result.unwrap_or_else(|err| {
        error!("Failed to build session cookies: {err}");
        Vec::new()
    })
}

pub async fn guard(
    Extension(state): Extension<Arc<WebState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_excluded(&path) {
        return next.run(request).await;
    }

    let project_ref = state.provider().project_ref().to_string();
    let (authenticated, cookies) = match check_session(&state, request.headers()).await {
        SessionCheck::Anonymous => (false, Vec::new()),
        SessionCheck::Valid { .. } => (true, Vec::new()),
        SessionCheck::Refreshed { user, session } => {
            debug!("Session refreshed for user {}", user.id);
            let cookies = refreshed_cookies(&state, request.headers(), Some(&session));
            match encode_session(&session) {
                Ok(encoded) => {
                    rewrite_request_session(request.headers_mut(), &project_ref, Some(&encoded));
                }
                Err(err) => error!("Failed to encode refreshed session: {err}"),
            }
            (true, cookies)
        }
        SessionCheck::Rejected => {
            let cookies = refreshed_cookies(&state, request.headers(), None);
            rewrite_request_session(request.headers_mut(), &project_ref, None);
            (false, cookies)
        }
        SessionCheck::Unavailable(err) => {
            warn!("Session check failed, passing through: {err}");
            return next.run(request).await;
        }
    };

    let mut response = match guard_target(&path, authenticated) {
        Some(target) => {
            debug!("Redirecting {} to {}", path, target);
            Redirect::temporary(target).into_response()
        }
        None => next.run(request).await,
    };
    prepend_cookies(&mut response, cookies);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excluded_paths() {
        assert!(is_excluded("/_next/static/chunks/app.js"));
        assert!(is_excluded("/_next/image?url=x"));
        assert!(is_excluded("/favicon.ico"));
        assert!(is_excluded("/api/profile"));
        assert!(!is_excluded("/api"));
        assert!(!is_excluded("/console"));
        assert!(!is_excluded("/"));
    }
}

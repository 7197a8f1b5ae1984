//! Token verification for protected API routes.
//!
//! Flow Overview: resolve credentials through the extractor chain, verify the
//! access token with the provider, and on rejection try the refresh token once.
//! A successful refresh rewrites the discrete cookies on the response; a failed
//! one clears them. Handlers behind [`require_auth`] read [`AuthUser`] from the
//! request extensions and never see unauthenticated requests.

use super::{handlers::message, ApiState};
use crate::{
    provider::{ProviderError, Session, User},
    server::{append_cookies, prepend_cookies},
    session::cookies::{clear_legacy_cookies, legacy_cookies},
};
use axum::{
    extract::{Extension, Request},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Verified caller, inserted into request extensions.
#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

#[derive(Debug)]
pub enum AuthOutcome {
    Verified(User),
    Refreshed { user: User, session: Session },
    Missing,
    Expired,
    /// The provider could not be reached or answered 5xx. Answered with 500
    /// and the cookies are kept, the credential itself was never judged.
    Failed(ProviderError),
}

pub async fn authenticate(state: &ApiState, headers: &HeaderMap) -> AuthOutcome {
    let credentials = state.extractors().resolve(headers);

    let Some((access_token, source)) = credentials.access_token else {
        return AuthOutcome::Missing;
    };

    debug!("Verifying access token from {}", source);

    match state.provider().get_user(&access_token).await {
        Ok(user) => return AuthOutcome::Verified(user),
        Err(err) if err.is_rejection() => debug!("Access token rejected: {err}"),
        Err(err) => return AuthOutcome::Failed(err),
    }

    let Some(refresh_token) = credentials.refresh_token else {
        return AuthOutcome::Expired;
    };

    let session = match state.provider().refresh_session(&refresh_token).await {
        Ok(session) => session,
        Err(err) if err.is_rejection() => {
            info!("Refresh token rejected: {err}");
            return AuthOutcome::Expired;
        }
        Err(err) => return AuthOutcome::Failed(err),
    };

    let user = match session.user.clone() {
        Some(user) => user,
        None => match state.provider().get_user(&session.access_token).await {
            Ok(user) => user,
            Err(err) if err.is_rejection() => return AuthOutcome::Expired,
            Err(err) => return AuthOutcome::Failed(err),
        },
    };

    AuthOutcome::Refreshed { user, session }
}

pub async fn require_auth(
    Extension(state): Extension<Arc<ApiState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, request.headers()).await {
        AuthOutcome::Verified(user) => {
            request.extensions_mut().insert(AuthUser(user));
            next.run(request).await
        }
        AuthOutcome::Refreshed { user, session } => {
            info!("Session refreshed for user {}", user.id);
            request.extensions_mut().insert(AuthUser(user));
            let mut response = next.run(request).await;
            match legacy_cookies(&session, state.secure_cookies()) {
                Ok(cookies) => prepend_cookies(&mut response, cookies),
                Err(err) => error!("Failed to build refreshed session cookies: {err}"),
            }
            response
        }
        AuthOutcome::Missing => message(StatusCode::UNAUTHORIZED, "Authentication required"),
        AuthOutcome::Expired => {
            let mut response = message(StatusCode::UNAUTHORIZED, "Session expired");
            match clear_legacy_cookies(state.secure_cookies()) {
                Ok(cookies) => append_cookies(&mut response, cookies),
                Err(err) => error!("Failed to build clearing cookies: {err}"),
            }
            response
        }
        AuthOutcome::Failed(err) => {
            error!("Failed to verify credentials: {err}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

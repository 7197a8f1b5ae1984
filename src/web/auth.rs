//! Browser auth endpoints: sign-up, password sign-in, OAuth start and sign-out.

use super::{guard::refreshed_cookies, WebState, LANDING_PATH};
use crate::{
    api::handlers::message,
    provider::{ProviderError, Session, SignUpRequest},
    server::append_cookies,
    session::{
        cookies::{code_verifier_cookie, parse_cookies, read_session, session_cookie_name},
        pkce::{code_challenge, generate_code_verifier},
    },
};
use axum::{
    extract::{Extension, Path},
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Deserialize, Debug)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SignUpResponse {
    pub message: String,
    pub user_id: Option<Uuid>,
    pub confirmation_required: bool,
}

#[derive(Deserialize, Debug)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SignInResponse {
    pub message: String,
    pub user_id: Option<Uuid>,
}

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

#[must_use]
pub fn valid_oauth_provider(name: &str) -> bool {
    Regex::new(r"^[a-z0-9_-]+$").is_ok_and(|re| re.is_match(name))
}

fn session_response(
    state: &WebState,
    headers: &HeaderMap,
    session: &Session,
    body: impl Serialize,
) -> Response {
    let mut response = (StatusCode::OK, Json(body)).into_response();
    append_cookies(&mut response, refreshed_cookies(state, headers, Some(session)));
    response
}

#[instrument(skip_all)]
pub async fn signup(
    Extension(state): Extension<Arc<WebState>>,
    headers: HeaderMap,
    payload: Option<Json<SignUpForm>>,
) -> Response {
    let Some(Json(form)) = payload else {
        return message(StatusCode::BAD_REQUEST, "Missing email or password");
    };

    let email = form.email.trim().to_lowercase();
    if !valid_email(&email) {
        return message(StatusCode::BAD_REQUEST, "Invalid email address");
    }
    if form.password.len() < MIN_PASSWORD_LENGTH {
        return message(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters",
        );
    }

    let request = SignUpRequest {
        email,
        password: form.password,
        full_name: form
            .full_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()),
        email_redirect_to: Some(state.callback_url()),
    };

    let outcome = match state.provider().sign_up(&request).await {
        Ok(outcome) => outcome,
        Err(err) if err.is_rejection() => {
            info!("Sign-up rejected: {err}");
            let reason = match &err {
                ProviderError::Rejected { message, .. } => message.as_str(),
                _ => "Sign-up failed",
            };
            return message(StatusCode::BAD_REQUEST, reason);
        }
        Err(err) => {
            error!("Sign-up failed: {err}");
            return message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let user_id = outcome.user.as_ref().map(|user| user.id);
    match outcome.session {
        Some(session) => session_response(
            &state,
            &headers,
            &session,
            SignUpResponse {
                message: "Signed up".to_string(),
                user_id,
                confirmation_required: false,
            },
        ),
        None => (
            StatusCode::OK,
            Json(SignUpResponse {
                message: "Check your email to confirm your account".to_string(),
                user_id,
                confirmation_required: true,
            }),
        )
            .into_response(),
    }
}

#[instrument(skip_all)]
pub async fn signin(
    Extension(state): Extension<Arc<WebState>>,
    headers: HeaderMap,
    payload: Option<Json<SignInForm>>,
) -> Response {
    let Some(Json(form)) = payload else {
        return message(StatusCode::BAD_REQUEST, "Missing email or password");
    };

    let email = form.email.trim().to_lowercase();
    match state
        .provider()
        .sign_in_with_password(&email, &form.password)
        .await
    {
        Ok(session) => {
            let user_id = session.user.as_ref().map(|user| user.id);
            session_response(
                &state,
                &headers,
                &session,
                SignInResponse {
                    message: "Signed in".to_string(),
                    user_id,
                },
            )
        }
        Err(err) if err.is_rejection() => {
            info!("Sign-in rejected: {err}");
            message(StatusCode::UNAUTHORIZED, "Invalid login credentials")
        }
        Err(err) => {
            error!("Sign-in failed: {err}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// Start an OAuth flow: store the PKCE verifier, send the browser to the provider.
#[instrument(skip(state))]
pub async fn oauth(
    Extension(state): Extension<Arc<WebState>>,
    Path(oauth_provider): Path<String>,
) -> Response {
    if !valid_oauth_provider(&oauth_provider) {
        return message(StatusCode::BAD_REQUEST, "Unsupported provider");
    }

    let provider = state.provider();
    let verifier = generate_code_verifier();
    let url = match provider.authorize_url(
        &oauth_provider,
        &state.callback_url(),
        &code_challenge(&verifier),
    ) {
        Ok(url) => url,
        Err(err) => {
            error!("Failed to build authorize URL: {err}");
            return message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let (Ok(cookie), Ok(location)) = (
        code_verifier_cookie(provider.project_ref(), &verifier, state.secure_cookies()),
        HeaderValue::from_str(url.as_str()),
    ) else {
        error!("Failed to build OAuth redirect headers");
        return message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
    };

    debug!("Redirecting to {} authorize endpoint", oauth_provider);
    let mut response = StatusCode::SEE_OTHER.into_response();
    response.headers_mut().insert(LOCATION, location);
    append_cookies(&mut response, vec![cookie]);
    response
}

#[instrument(skip_all)]
pub async fn signout(Extension(state): Extension<Arc<WebState>>, headers: HeaderMap) -> Response {
    let provider = state.provider();
    let cookies = parse_cookies(&headers);

    if let Some(session) = read_session(&cookies, &session_cookie_name(provider.project_ref())) {
        if let Err(err) = provider.sign_out(&session.access_token).await {
            warn!("Provider sign-out failed: {err}");
        }
    }

    let mut response = Redirect::to(LANDING_PATH).into_response();
    append_cookies(&mut response, refreshed_cookies(&state, &headers, None));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(valid_email("ada@example.com"));
        assert!(!valid_email("ada@example"));
        assert!(!valid_email("ada example.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn oauth_provider_names() {
        assert!(valid_oauth_provider("google"));
        assert!(valid_oauth_provider("linkedin_oidc"));
        assert!(!valid_oauth_provider("Google"));
        assert!(!valid_oauth_provider("../admin"));
        assert!(!valid_oauth_provider(""));
    }
}

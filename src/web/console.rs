//! The protected console page.
//!
//! The guard has already refreshed the session if it needed to, so the
//! request's cookie holds the current access token. The page re-checks it with
//! the provider, then fetches the profile from the internal API; a failed
//! profile lookup only downgrades the greeting.

use super::{
    guard::{check_session, refreshed_cookies, SessionCheck},
    LANDING_PATH, WebState,
};
use crate::{api::handlers::profile::ProfileResponse, provider::User, server::append_cookies};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub const DEFAULT_NAME: &str = "there";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConsoleView {
    pub name: String,
    pub first_name: String,
    pub email: String,
    pub initials: String,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

impl ConsoleView {
    /// Profile values first, provider identity second.
    #[must_use]
    pub fn new(user: &User, profile: Option<&ProfileResponse>) -> Self {
        let email = profile
            .and_then(|profile| non_blank(profile.email.as_deref()))
            .or_else(|| non_blank(user.email.as_deref()))
            .unwrap_or_default()
            .to_string();

        let name = profile
            .and_then(|profile| non_blank(profile.name.as_deref()))
            .or_else(|| user.full_name())
            .or_else(|| non_blank(email.split('@').next()))
            .unwrap_or(DEFAULT_NAME)
            .to_string();

        let first_name = name
            .split_whitespace()
            .next()
            .unwrap_or(DEFAULT_NAME)
            .to_string();

        let initials: String = name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .flat_map(char::to_uppercase)
            .take(2)
            .collect();

        Self {
            name,
            first_name,
            email,
            initials,
        }
    }
}

#[instrument(skip_all)]
pub async fn console(Extension(state): Extension<Arc<WebState>>, headers: HeaderMap) -> Response {
    let (user, session, cookies) = match check_session(&state, &headers).await {
        SessionCheck::Valid { user, session } => (user, session, Vec::new()),
        SessionCheck::Refreshed { user, session } => {
            let cookies = refreshed_cookies(&state, &headers, Some(&session));
            (user, session, cookies)
        }
        SessionCheck::Unavailable(err) => {
            warn!("Failed to load user for console: {err}");
            return Redirect::temporary(LANDING_PATH).into_response();
        }
        SessionCheck::Anonymous | SessionCheck::Rejected => {
            debug!("No user for console, redirecting");
            return Redirect::temporary(LANDING_PATH).into_response();
        }
    };

    let profile = state
        .cache()
        .get_or_fetch(&session.access_token, state.profiles())
        .await;

    let view = ConsoleView::new(&user, profile.as_ref());
    let mut response = (StatusCode::OK, Json(view)).into_response();
    append_cookies(&mut response, cookies);
    response
}

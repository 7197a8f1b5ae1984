//! OAuth / email-confirmation landing: exchange the code and go to the console.

use super::{
    guard::refreshed_cookies,
    redirect::{callback_target, CallbackOutcome},
    WebState,
};
use crate::{
    server::append_cookies,
    session::cookies::{
        clear_code_verifier_cookie, code_verifier_cookie_name, cookie_value, parse_cookies,
    },
};
use axum::{
    extract::{Extension, Query},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

#[derive(Deserialize, Debug, Default)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[instrument(skip_all)]
pub async fn callback(
    Extension(state): Extension<Arc<WebState>>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(err) = &query.error {
        warn!(
            "Provider returned an error to the callback: {} {}",
            err,
            query.error_description.as_deref().unwrap_or_default()
        );
    }

    let code = query.code.filter(|code| !code.trim().is_empty());
    let Some(code) = code else {
        return Redirect::temporary(callback_target(CallbackOutcome::NoCode)).into_response();
    };

    let provider = state.provider();
    let cookies = parse_cookies(&headers);
    let verifier = cookie_value(&cookies, &code_verifier_cookie_name(provider.project_ref()));

    let (outcome, mut set_cookies) = match provider.exchange_code_for_session(&code, verifier).await
    {
        Ok(session) => {
            info!("Exchanged auth code for a session");
            let cookies = refreshed_cookies(&state, &headers, Some(&session));
            (CallbackOutcome::Exchanged, cookies)
        }
        Err(err) => {
            warn!("Failed to exchange auth code: {err}");
            (CallbackOutcome::ExchangeFailed, Vec::new())
        }
    };

    if verifier.is_some() {
        match clear_code_verifier_cookie(provider.project_ref(), state.secure_cookies()) {
            Ok(cookie) => set_cookies.push(cookie),
            Err(err) => error!("Failed to clear code verifier cookie: {err}"),
        }
    }

    let mut response = Redirect::temporary(callback_target(outcome)).into_response();
    append_cookies(&mut response, set_cookies);
    response
}

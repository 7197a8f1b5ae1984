//! Token hand-off from the browser client to the API.
//!
//! The browser posts the pair it received from the provider; the API verifies
//! the access token and stores both in the discrete `HttpOnly` cookies.

use super::{message, MessageBody};
use crate::{
    api::ApiState,
    provider::{Session, User},
    server::append_cookies,
    session::cookies::legacy_cookies,
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct CallbackTokens {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CallbackResponse {
    pub message: String,
    pub user: User,
}

fn non_empty(token: Option<String>) -> Option<String> {
    token.filter(|token| !token.trim().is_empty())
}

#[utoipa::path(
    post,
    path = "/api/auth/callback",
    request_body = CallbackTokens,
    responses(
        (status = 200, description = "Tokens verified and stored in cookies", body = CallbackResponse),
        (status = 400, description = "Access or refresh token missing", body = MessageBody),
        (status = 401, description = "Provider rejected the access token", body = MessageBody),
        (status = 500, description = "Provider unreachable", body = MessageBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn callback(
    Extension(state): Extension<Arc<ApiState>>,
    payload: Option<Json<CallbackTokens>>,
) -> Response {
    let tokens = payload.map(|Json(tokens)| tokens).unwrap_or_default();

    let (Some(access_token), Some(refresh_token)) = (
        non_empty(tokens.access_token),
        non_empty(tokens.refresh_token),
    ) else {
        return message(StatusCode::BAD_REQUEST, "Missing tokens");
    };

    let user = match state.provider().get_user(&access_token).await {
        Ok(user) => user,
        Err(err) if err.is_rejection() => {
            info!("Callback tokens rejected: {err}");
            return message(StatusCode::UNAUTHORIZED, "Invalid tokens");
        }
        Err(err) => {
            error!("Failed to verify callback tokens: {err}");
            return message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let session = Session::new(access_token, refresh_token);
    let cookies = match legacy_cookies(&session, state.secure_cookies()) {
        Ok(cookies) => cookies,
        Err(err) => {
            error!("Failed to build session cookies: {err}");
            return message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let mut response = (
        StatusCode::OK,
        Json(CallbackResponse {
            message: "Authentication successful".to_string(),
            user,
        }),
    )
        .into_response();
    append_cookies(&mut response, cookies);
    response
}

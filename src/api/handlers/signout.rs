use super::{message, MessageBody};
use crate::{
    api::{auth::AuthUser, ApiState},
    server::append_cookies,
    session::cookies::clear_legacy_cookies,
};
use axum::{extract::Extension, http::StatusCode, response::Response};
use std::sync::Arc;
use tracing::{error, info};

#[utoipa::path(
    post,
    path = "/api/auth/signout",
    responses(
        (status = 200, description = "Session cookies cleared", body = MessageBody),
        (status = 401, description = "Missing or expired credentials", body = MessageBody)
    ),
    tag = "auth"
)]
pub async fn signout(
    Extension(state): Extension<Arc<ApiState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Response {
    info!("Signing out user {}", user.id);

    let mut response = message(StatusCode::OK, "Signed out successfully");
    match clear_legacy_cookies(state.secure_cookies()) {
        Ok(cookies) => append_cookies(&mut response, cookies),
        Err(err) => error!("Failed to build clearing cookies: {err}"),
    }
    response
}

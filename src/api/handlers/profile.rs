use super::{message, MessageBody};
use crate::api::{auth::AuthUser, ApiState};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

/// Only the display fields leave the API.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProfileResponse {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Profile of the authenticated user", body = ProfileResponse),
        (status = 401, description = "Missing or expired credentials", body = MessageBody),
        (status = 404, description = "No profile row for the user", body = MessageBody),
        (status = 500, description = "Profile query failed", body = MessageBody)
    ),
    tag = "profile"
)]
pub async fn profile(
    Extension(state): Extension<Arc<ApiState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Response {
    match state.store().find_profile(user.id).await {
        Ok(Some(record)) => {
            debug!("Profile found for user {}", user.id);
            let response = ProfileResponse {
                name: record.full_name,
                email: record.email,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => message(StatusCode::NOT_FOUND, "Profile not found"),
        Err(err) => {
            error!("Failed to fetch profile for user {}: {err}", user.id);
            message(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error fetching profile data",
            )
        }
    }
}

use crate::api::handlers::{
    health::{x_app_headers, Health},
    message, MessageBody,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

pub const LANDING_MESSAGE: &str = "Welcome to LinkedUpp";

/// Public landing page; signed-in visitors never reach it.
pub async fn landing() -> Json<MessageBody> {
    Json(MessageBody::new(LANDING_MESSAGE))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, x_app_headers(), Json(Health::new(None)))
}

pub async fn not_found() -> Response {
    message(StatusCode::NOT_FOUND, "Not found")
}

pub mod callback;
pub mod health;
pub mod profile;
pub mod root;
pub mod signout;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of every non-data response: `{"message": "..."}`.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn message(status: StatusCode, message: &str) -> Response {
    (status, Json(MessageBody::new(message))).into_response()
}

pub async fn not_found() -> Response {
    message(StatusCode::NOT_FOUND, "Not found")
}

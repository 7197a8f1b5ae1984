use super::MessageBody;
use axum::Json;

pub const WELCOME_MESSAGE: &str = "Welcome to LinkedUpp API";

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "API is reachable", body = MessageBody)
    ),
    tag = "linkedupp"
)]
pub async fn root() -> Json<MessageBody> {
    Json(MessageBody::new(WELCOME_MESSAGE))
}

use super::handlers::{
    callback::{self, CallbackResponse, CallbackTokens},
    health::{self, Health},
    profile::{self, ProfileResponse},
    root, signout, MessageBody,
};
use crate::provider::{User, UserMetadata};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        root::root,
        health::health,
        callback::callback,
        signout::signout,
        profile::profile,
    ),
    components(schemas(
        MessageBody,
        Health,
        CallbackTokens,
        CallbackResponse,
        ProfileResponse,
        User,
        UserMetadata,
    )),
    tags(
        (name = "linkedupp", description = "LinkedUpp internal API"),
        (name = "auth", description = "Session hand-off and sign-out"),
        (name = "profile", description = "Profile of the authenticated user"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for path in [
            "/",
            "/health",
            "/api/auth/callback",
            "/api/auth/signout",
            "/api/profile",
        ] {
            assert!(paths.contains(&path), "missing {path} in {paths:?}");
        }
    }
}

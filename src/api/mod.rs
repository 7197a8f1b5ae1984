//! Internal API process.

pub mod auth;
pub mod handlers;
pub mod openapi;
pub mod store;

use crate::{
    provider::IdentityProvider,
    server::{
        bind_with_fallback, make_span, origin, propagate_request_id_layer,
        set_request_id_layer, shutdown_signal,
    },
    session::ExtractorChain,
};
use anyhow::Result;
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post},
    Extension, Router,
};
use handlers::{callback, health, not_found, profile, root, signout};
use std::sync::Arc;
use store::ProfileStore;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use utoipa_swagger_ui::SwaggerUi;

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_CLIENT_URL: &str = "http://localhost:3000";
/// Ports tried when the configured one is taken.
pub const PORT_ATTEMPTS: u16 = 10;

pub struct ApiState {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn ProfileStore>,
    extractors: ExtractorChain,
    secure_cookies: bool,
}

impl ApiState {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn ProfileStore>) -> Self {
        Self {
            provider,
            store,
            extractors: ExtractorChain::default(),
            secure_cookies: false,
        }
    }

    #[must_use]
    pub const fn with_secure_cookies(mut self, secure_cookies: bool) -> Self {
        self.secure_cookies = secure_cookies;
        self
    }

    #[must_use]
    pub fn with_extractors(mut self, extractors: ExtractorChain) -> Self {
        self.extractors = extractors;
        self
    }

    #[must_use]
    pub fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    #[must_use]
    pub fn store(&self) -> &dyn ProfileStore {
        self.store.as_ref()
    }

    #[must_use]
    pub const fn extractors(&self) -> &ExtractorChain {
        &self.extractors
    }

    #[must_use]
    pub const fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}

/// Routes with state attached; transport layers are added by [`new`].
pub fn router(state: Arc<ApiState>) -> Router {
    let protected = Router::new()
        .route("/api/profile", get(profile::profile))
        .route("/api/auth/profile", get(profile::profile))
        .route("/api/auth/signout", post(signout::signout))
        .route_layer(middleware::from_fn(auth::require_auth));

    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health))
        .route("/api/auth/callback", post(callback::callback))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::openapi()))
        .fallback(not_found)
        .layer(Extension(state))
}

/// # Errors
/// Returns an error if the client URL is not a valid origin.
pub fn cors_layer(client_url: &str) -> Result<CorsLayer> {
    Ok(CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(AllowOrigin::exact(origin(client_url)?))
        .allow_credentials(true))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, client_url: &str, state: Arc<ApiState>) -> Result<()> {
    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(set_request_id_layer())
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors_layer(client_url)?),
    );

    let (listener, port) = bind_with_fallback("::0", port, PORT_ATTEMPTS).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

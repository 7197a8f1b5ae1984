//! Edge process: navigation guard, auth callback and the console page.

pub mod auth;
pub mod callback;
pub mod console;
pub mod guard;
pub mod pages;
pub mod profile;
pub mod redirect;

use crate::{
    provider::IdentityProvider,
    server::{
        bind_with_fallback, make_span, propagate_request_id_layer, set_request_id_layer,
        shutdown_signal,
    },
};
use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use profile::{ProfileCache, ProfileSource};
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;
use url::Url;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_API_URL: &str = "http://localhost:5001";
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";

pub const LANDING_PATH: &str = "/";
pub const CONSOLE_PATH: &str = "/console";
pub const PROTECTED_PREFIX: &str = "/console";
pub const CALLBACK_PATH: &str = "/auth/callback";

pub struct WebState {
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileSource>,
    cache: ProfileCache,
    site_url: Url,
    secure_cookies: bool,
}

impl WebState {
    /// # Errors
    /// Returns an error if `site_url` is not a valid URL.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileSource>,
        site_url: &str,
    ) -> Result<Self> {
        let site_url =
            Url::parse(site_url).with_context(|| format!("Invalid site URL: {site_url}"))?;
        Ok(Self {
            provider,
            profiles,
            cache: ProfileCache::default(),
            site_url,
            secure_cookies: false,
        })
    }

    #[must_use]
    pub const fn with_secure_cookies(mut self, secure_cookies: bool) -> Self {
        self.secure_cookies = secure_cookies;
        self
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = ProfileCache::new(ttl);
        self
    }

    #[must_use]
    pub fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    #[must_use]
    pub fn profiles(&self) -> &dyn ProfileSource {
        self.profiles.as_ref()
    }

    #[must_use]
    pub const fn cache(&self) -> &ProfileCache {
        &self.cache
    }

    #[must_use]
    pub const fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    /// Absolute URL of the auth callback, handed to the provider as `redirect_to`.
    #[must_use]
    pub fn callback_url(&self) -> String {
        self.site_url
            .join(CALLBACK_PATH)
            .map_or_else(|_| CALLBACK_PATH.to_string(), String::from)
    }
}

/// Routes behind the guard, with state attached.
pub fn router(state: Arc<WebState>) -> Router {
    Router::new()
        .route(LANDING_PATH, get(pages::landing))
        .route(CONSOLE_PATH, get(console::console))
        .route(CALLBACK_PATH, get(callback::callback))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/signin", post(auth::signin))
        .route("/auth/signout", post(auth::signout))
        .route("/auth/oauth/:provider", get(auth::oauth))
        .route("/health", get(pages::health))
        .fallback(pages::not_found)
        .layer(middleware::from_fn(guard::guard))
        .layer(Extension(state))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, state: Arc<WebState>) -> Result<()> {
    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(set_request_id_layer())
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    );

    let (listener, port) = bind_with_fallback("::0", port, crate::api::PORT_ATTEMPTS).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

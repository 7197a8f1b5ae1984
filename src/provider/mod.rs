//! Identity provider client.
//!
//! Flow Overview: handlers never talk to the provider directly. They receive an
//! `Arc<dyn IdentityProvider>` built once at startup, which keeps the HTTP
//! client, base URL and API key in one place and lets tests swap in fakes.

pub mod supabase;
pub mod types;

pub use self::supabase::SupabaseClient;
pub use self::types::{unix_now, Session, SignUpOutcome, SignUpRequest, User, UserMetadata};

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered and refused the request (bad token, bad code, ...).
    #[error("provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode provider response: {0}")]
    Decode(String),
    #[error("invalid provider configuration: {0}")]
    Config(String),
}

impl ProviderError {
    /// True when the provider looked at the credential and said no.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if *status >= 400 && *status < 500)
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Project reference used in the combined session cookie name.
    fn project_ref(&self) -> &str;

    async fn get_user(&self, access_token: &str) -> Result<User, ProviderError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, ProviderError>;

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Session, ProviderError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError>;

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, ProviderError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError>;

    /// URL that starts an OAuth flow with PKCE (S256).
    ///
    /// # Errors
    /// Returns an error if the authorize URL cannot be built.
    fn authorize_url(
        &self,
        oauth_provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<Url, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_only_for_client_errors() {
        let rejected = ProviderError::Rejected {
            status: 401,
            message: "invalid JWT".to_string(),
        };
        assert!(rejected.is_rejection());

        let unavailable = ProviderError::Rejected {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(!unavailable.is_rejection());

        assert!(!ProviderError::Decode("eof".to_string()).is_rejection());
    }

    #[test]
    fn error_display_includes_status() {
        let err = ProviderError::Rejected {
            status: 400,
            message: "Invalid Refresh Token".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "provider rejected request (400): Invalid Refresh Token"
        );
    }
}

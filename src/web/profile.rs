//! Profile lookups against the internal API, with a short-lived cache.

use crate::{api::handlers::profile::ProfileResponse, APP_USER_AGENT};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, info_span, warn, Instrument};
use url::Url;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, access_token: &str) -> Result<ProfileResponse>;
}

/// `GET {api}/api/profile` with the caller's bearer token.
pub struct InternalApiClient {
    profile_url: Url,
    client: Client,
}

impl InternalApiClient {
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(api_url: &str) -> Result<Self> {
        let base = Url::parse(api_url).with_context(|| format!("Invalid API URL: {api_url}"))?;
        let profile_url = base
            .join("/api/profile")
            .with_context(|| format!("Invalid API URL: {api_url}"))?;
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            profile_url,
            client,
        })
    }
}

#[async_trait]
impl ProfileSource for InternalApiClient {
    async fn fetch_profile(&self, access_token: &str) -> Result<ProfileResponse> {
        let span = info_span!(
            "api.profile",
            http.method = "GET",
            url = %self.profile_url
        );
        let response = self
            .client
            .get(self.profile_url.clone())
            .bearer_auth(access_token)
            .send()
            .instrument(span)
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{} - {}", self.profile_url, status));
        }

        Ok(response.json().await?)
    }
}

struct CachedProfile {
    profile: ProfileResponse,
    fetched_at: Instant,
}

/// Profiles keyed by a hash of the access token.
pub struct ProfileCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedProfile>>,
}

impl Default for ProfileCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl ProfileCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn key(access_token: &str) -> String {
        Base64UrlUnpadded::encode_string(&Sha256::digest(access_token.as_bytes()))
    }

    pub async fn get(&self, access_token: &str) -> Option<ProfileResponse> {
        let entries = self.entries.read().await;
        entries
            .get(&Self::key(access_token))
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.profile.clone())
    }

    pub async fn insert(&self, access_token: &str, profile: ProfileResponse) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.fetched_at.elapsed() < self.ttl);
        entries.insert(
            Self::key(access_token),
            CachedProfile {
                profile,
                fetched_at: Instant::now(),
            },
        );
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Cached profile, or a fresh fetch. Failures are logged and not cached.
    pub async fn get_or_fetch(
        &self,
        access_token: &str,
        source: &dyn ProfileSource,
    ) -> Option<ProfileResponse> {
        if let Some(profile) = self.get(access_token).await {
            debug!("Profile cache hit");
            return Some(profile);
        }

        match source.fetch_profile(access_token).await {
            Ok(profile) => {
                self.insert(access_token, profile.clone()).await;
                Some(profile)
            }
            Err(err) => {
                warn!("Failed to fetch profile from API: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ProfileSource for CountingSource {
        async fn fetch_profile(&self, access_token: &str) -> Result<ProfileResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("boom"));
            }
            Ok(ProfileResponse {
                name: Some(format!("name-for-{access_token}")),
                email: None,
            })
        }
    }

    fn source(fail: bool) -> CountingSource {
        CountingSource {
            calls: AtomicUsize::new(0),
            fail,
        }
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let cache = ProfileCache::default();
        let source = source(false);

        let first = cache.get_or_fetch("token-a", &source).await;
        let second = cache.get_or_fetch("token-a", &source).await;
        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let other = cache.get_or_fetch("token-b", &source).await;
        assert_eq!(other.unwrap().name.as_deref(), Some("name-for-token-b"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched_and_pruned() {
        let cache = ProfileCache::new(Duration::ZERO);
        let source = source(false);

        cache.get_or_fetch("token-a", &source).await;
        cache.get_or_fetch("token-a", &source).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = ProfileCache::default();
        let source = source(true);

        assert!(cache.get_or_fetch("token-a", &source).await.is_none());
        assert!(cache.get_or_fetch("token-a", &source).await.is_none());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty().await);
    }

    #[test]
    fn client_builds_profile_url() {
        let client = InternalApiClient::new("http://localhost:5001").unwrap();
        assert_eq!(client.profile_url.as_str(), "http://localhost:5001/api/profile");
        assert!(InternalApiClient::new("::").is_err());
    }
}

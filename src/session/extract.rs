//! Credential extraction.
//!
//! Requests may carry credentials in several places. Each place is one
//! [`CredentialExtractor`]; an [`ExtractorChain`] asks them in priority order
//! and takes the first access token and the first refresh token it finds.

use super::cookies::{
    cookie_value, parse_cookies, read_any_session, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    StructuredCookie,
    LegacyCookies,
    BearerHeader,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StructuredCookie => "structured_cookie",
            Self::LegacyCookies => "legacy_cookies",
            Self::BearerHeader => "bearer_header",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub source: CredentialSource,
}

pub trait CredentialExtractor: Send + Sync {
    /// `None` when this source carries nothing usable.
    fn extract(&self, headers: &HeaderMap) -> Option<Credentials>;
}

/// `sb-<ref>-auth-token` (possibly chunked).
pub struct StructuredCookie;

impl CredentialExtractor for StructuredCookie {
    fn extract(&self, headers: &HeaderMap) -> Option<Credentials> {
        let session = read_any_session(&parse_cookies(headers))?;
        Some(Credentials {
            access_token: Some(session.access_token),
            refresh_token: Some(session.refresh_token).filter(|token| !token.is_empty()),
            source: CredentialSource::StructuredCookie,
        })
    }
}

/// `sb-access-token` / `sb-refresh-token`.
pub struct LegacyCookies;

impl CredentialExtractor for LegacyCookies {
    fn extract(&self, headers: &HeaderMap) -> Option<Credentials> {
        let cookies = parse_cookies(headers);
        let access_token = cookie_value(&cookies, ACCESS_TOKEN_COOKIE).map(str::to_string);
        let refresh_token = cookie_value(&cookies, REFRESH_TOKEN_COOKIE).map(str::to_string);
        if access_token.is_none() && refresh_token.is_none() {
            return None;
        }
        Some(Credentials {
            access_token,
            refresh_token,
            source: CredentialSource::LegacyCookies,
        })
    }
}

/// `Authorization: Bearer <token>`.
pub struct BearerHeader;

impl CredentialExtractor for BearerHeader {
    fn extract(&self, headers: &HeaderMap) -> Option<Credentials> {
        extract_bearer_token(headers).map(|token| Credentials {
            access_token: Some(token),
            refresh_token: None,
            source: CredentialSource::BearerHeader,
        })
    }
}

#[must_use]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Tokens resolved from a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedCredentials {
    pub access_token: Option<(String, CredentialSource)>,
    pub refresh_token: Option<String>,
}

pub struct ExtractorChain {
    extractors: Vec<Box<dyn CredentialExtractor>>,
}

impl ExtractorChain {
    #[must_use]
    pub fn new(extractors: Vec<Box<dyn CredentialExtractor>>) -> Self {
        Self { extractors }
    }

    #[must_use]
    pub fn resolve(&self, headers: &HeaderMap) -> ResolvedCredentials {
        let mut resolved = ResolvedCredentials::default();
        for extractor in &self.extractors {
            let Some(credentials) = extractor.extract(headers) else {
                continue;
            };
            if resolved.access_token.is_none() {
                resolved.access_token = credentials
                    .access_token
                    .map(|token| (token, credentials.source));
            }
            if resolved.refresh_token.is_none() {
                resolved.refresh_token = credentials.refresh_token;
            }
            if resolved.access_token.is_some() && resolved.refresh_token.is_some() {
                break;
            }
        }
        resolved
    }
}

impl Default for ExtractorChain {
    /// Structured cookie, then legacy cookies, then the bearer header.
    fn default() -> Self {
        Self::new(vec![
            Box::new(StructuredCookie),
            Box::new(LegacyCookies),
            Box::new(BearerHeader),
        ])
    }
}

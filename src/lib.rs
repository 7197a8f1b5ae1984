//! # LinkedUpp (auth relay)
//!
//! `linkedupp` relays authentication between a browser, the server-rendered
//! console, and the internal API. Identity is owned by a hosted provider that
//! speaks the GoTrue REST protocol; this crate never stores credentials.
//!
//! ## Processes
//!
//! - **web**: the edge process. A guard runs on every navigation, refreshing
//!   expired sessions and redirecting between the landing page (`/`) and the
//!   protected console (`/console`). It also serves the OAuth/email callback and
//!   the console page, which fetches the profile from the internal API.
//! - **api**: the internal API. Every protected route re-verifies the caller's
//!   access token with the provider, refreshes it transparently when possible,
//!   and reads the `profiles` table.
//!
//! ## Session cookies
//!
//! The browser stores the provider session in `sb-<project-ref>-auth-token`
//! (optionally split into `.0`, `.1`, ... chunks). The API additionally accepts
//! the discrete `sb-access-token` / `sb-refresh-token` cookies and a bearer
//! header, in that order.

pub mod api;
pub mod cli;
pub mod provider;
pub mod server;
pub mod session;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Short commit hash used in the `X-App` header.
#[must_use]
pub fn short_commit_hash() -> &'static str {
    if GIT_COMMIT_HASH.len() > 7 {
        &GIT_COMMIT_HASH[0..7]
    } else {
        ""
    }
}

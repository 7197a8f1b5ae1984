//! Session transport: cookies, credential extraction, and PKCE helpers shared
//! by the web and api processes.

pub mod cookies;
pub mod extract;
pub mod pkce;

pub use self::extract::{
    BearerHeader, CredentialExtractor, CredentialSource, Credentials, ExtractorChain,
    LegacyCookies, ResolvedCredentials, StructuredCookie,
};

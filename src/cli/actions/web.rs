use crate::{
    cli::globals::GlobalArgs,
    provider::SupabaseClient,
    web::{self, profile::InternalApiClient, WebState},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub supabase_url: String,
    pub anon_key: SecretString,
    pub api_url: String,
    pub site_url: String,
    pub globals: GlobalArgs,
}

/// Serve the edge process.
/// # Errors
/// Returns an error if a URL is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(
        port = args.port,
        api_url = %args.api_url,
        site_url = %args.site_url,
        environment = %args.globals.environment,
        "starting web"
    );

    let provider = SupabaseClient::new(&args.supabase_url, args.anon_key)
        .context("Failed to configure identity provider")?;
    let profiles = InternalApiClient::new(&args.api_url)?;

    let state = WebState::new(Arc::new(provider), Arc::new(profiles), &args.site_url)?
        .with_secure_cookies(args.globals.is_production());

    web::new(args.port, Arc::new(state)).await
}

use crate::{
    api::{self, store::PgProfileStore, ApiState},
    cli::globals::GlobalArgs,
    provider::SupabaseClient,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub supabase_url: String,
    pub service_role_key: SecretString,
    pub client_url: String,
    pub globals: GlobalArgs,
}

/// Connect to the database and the provider, then serve the internal API.
/// # Errors
/// Returns an error if the database is unreachable, the provider URL is invalid,
/// or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(
        port = args.port,
        client_url = %args.client_url,
        environment = %args.globals.environment,
        "starting api"
    );

    let provider = SupabaseClient::new(&args.supabase_url, args.service_role_key)
        .context("Failed to configure identity provider")?;

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&args.dsn)
        .await
        .context("Failed to connect to database")?;

    info!("Connected to database");

    let state = ApiState::new(Arc::new(provider), Arc::new(PgProfileStore::new(pool)))
        .with_secure_cookies(args.globals.is_production());

    api::new(args.port, &args.client_url, Arc::new(state)).await
}

//! Map parsed arguments to the action for the selected process.

use crate::cli::{
    actions::{api, web, Action},
    commands::{self, ARG_ENVIRONMENT},
    globals::GlobalArgs,
};
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;

fn required(matches: &ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))
}

/// # Errors
/// Returns an error if no subcommand was given or a required argument is missing.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let Some((name, sub)) = matches.subcommand() else {
        return Err(anyhow!("missing subcommand: api or web"));
    };

    let globals = GlobalArgs::new(
        sub.get_one::<String>(ARG_ENVIRONMENT)
            .map_or("development", String::as_str),
    );

    match name {
        commands::api::NAME => Ok(Action::Api(api::Args {
            port: sub
                .get_one::<u16>(commands::api::ARG_PORT)
                .copied()
                .unwrap_or(crate::api::DEFAULT_PORT),
            dsn: required(sub, commands::api::ARG_DSN)?,
            supabase_url: required(sub, commands::api::ARG_SUPABASE_URL)?,
            service_role_key: SecretString::from(required(
                sub,
                commands::api::ARG_SERVICE_ROLE_KEY,
            )?),
            client_url: required(sub, commands::api::ARG_CLIENT_URL)?,
            globals,
        })),
        commands::web::NAME => Ok(Action::Web(web::Args {
            port: sub
                .get_one::<u16>(commands::web::ARG_PORT)
                .copied()
                .unwrap_or(crate::web::DEFAULT_PORT),
            supabase_url: required(sub, commands::web::ARG_SUPABASE_URL)?,
            anon_key: SecretString::from(required(sub, commands::web::ARG_ANON_KEY)?),
            api_url: required(sub, commands::web::ARG_API_URL)?,
            site_url: required(sub, commands::web::ARG_SITE_URL)?,
            globals,
        })),
        other => Err(anyhow!("unknown subcommand: {other}")),
    }
}

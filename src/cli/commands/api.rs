use crate::api::DEFAULT_CLIENT_URL;
use clap::{Arg, Command};

pub const NAME: &str = "api";

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_SUPABASE_URL: &str = "supabase-url";
pub const ARG_SERVICE_ROLE_KEY: &str = "service-role-key";
pub const ARG_CLIENT_URL: &str = "client-url";

#[must_use]
pub fn subcommand() -> Command {
    Command::new(NAME)
        .about("Internal API: token verification and profile retrieval")
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on, the next free one is used if taken")
                .default_value("5001")
                .env("PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("LINKEDUPP_DSN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SUPABASE_URL)
                .long(ARG_SUPABASE_URL)
                .help("Identity provider URL, example: https://<project-ref>.supabase.co")
                .env("SUPABASE_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SERVICE_ROLE_KEY)
                .long(ARG_SERVICE_ROLE_KEY)
                .help("Identity provider service role key")
                .env("SERVICE_ROLE_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_CLIENT_URL)
                .long(ARG_CLIENT_URL)
                .help("Browser origin allowed by CORS")
                .default_value(DEFAULT_CLIENT_URL)
                .env("CLIENT_URL"),
        )
}

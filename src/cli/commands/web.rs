use crate::web::{DEFAULT_API_URL, DEFAULT_SITE_URL};
use clap::{Arg, Command};

pub const NAME: &str = "web";

pub const ARG_PORT: &str = "port";
pub const ARG_SUPABASE_URL: &str = "supabase-url";
pub const ARG_ANON_KEY: &str = "anon-key";
pub const ARG_API_URL: &str = "api-url";
pub const ARG_SITE_URL: &str = "site-url";

#[must_use]
pub fn subcommand() -> Command {
    Command::new(NAME)
        .about("Edge process: navigation guard, auth callback and console")
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on, the next free one is used if taken")
                .default_value("3000")
                .env("PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SUPABASE_URL)
                .long(ARG_SUPABASE_URL)
                .help("Identity provider URL, example: https://<project-ref>.supabase.co")
                .env("NEXT_PUBLIC_SUPABASE_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_ANON_KEY)
                .long(ARG_ANON_KEY)
                .help("Identity provider anonymous (public) key")
                .env("NEXT_PUBLIC_SUPABASE_ANON_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Internal API base URL")
                .default_value(DEFAULT_API_URL)
                .env("LINKEDUPP_API_URL"),
        )
        .arg(
            Arg::new(ARG_SITE_URL)
                .long(ARG_SITE_URL)
                .help("Public site URL, used to build auth redirect links")
                .default_value(DEFAULT_SITE_URL)
                .env("LINKEDUPP_SITE_URL"),
        )
}

pub mod api;
pub mod web;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};

pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_VERBOSITY: &str = "verbosity";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// `LINKEDUPP_LOG_LEVEL` accepts a level name or its index, `-v` counts up.
fn parse_log_level(level: &str) -> Result<u8, String> {
    let level = level.trim().to_lowercase();
    let index = match level.parse::<usize>() {
        Ok(index) if index < LOG_LEVELS.len() => Some(index),
        Ok(_) => None,
        Err(_) => LOG_LEVELS.iter().position(|name| *name == level),
    };
    index
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("unknown log level `{level}`, expected one of {LOG_LEVELS:?}"))
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    Command::new("linkedupp")
        .about("Auth relay for the LinkedUpp console")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long("environment")
                .help("Deployment environment, `production` marks cookies Secure")
                .default_value("development")
                .env("NODE_ENV")
                .global(true),
        )
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Log verbosity, repeat to raise: -v warn, -vv info, -vvv debug, -vvvv trace")
                .env("LINKEDUPP_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(parse_log_level),
        )
        .subcommand(api::subcommand())
        .subcommand(web::subcommand())
}

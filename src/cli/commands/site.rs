use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_BASE_URL: &str = "base-url";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_REMEMBER_TTL_SECONDS: &str = "remember-ttl-seconds";

#[derive(Debug)]
pub struct Options {
    pub base_url: String,
    pub session_ttl_seconds: i64,
    pub remember_ttl_seconds: i64,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is unexpectedly missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            base_url: matches
                .get_one::<String>(ARG_BASE_URL)
                .cloned()
                .context("missing required argument: --base-url")?,
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .context("missing required argument: --session-ttl-seconds")?,
            remember_ttl_seconds: matches
                .get_one::<i64>(ARG_REMEMBER_TTL_SECONDS)
                .copied()
                .context("missing required argument: --remember-ttl-seconds")?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BASE_URL)
                .long(ARG_BASE_URL)
                .help("Public base URL of the site, used as OpenID realm and return address")
                .env("SCRIPTFAN_BASE_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Lifetime of a regular session in seconds")
                .env("SCRIPTFAN_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(i64).range(60..)),
        )
        .arg(
            Arg::new(ARG_REMEMBER_TTL_SECONDS)
                .long(ARG_REMEMBER_TTL_SECONDS)
                .help("Lifetime of a \"remember me\" session in seconds")
                .env("SCRIPTFAN_REMEMBER_TTL_SECONDS")
                .default_value("31536000")
                .value_parser(clap::value_parser!(i64).range(60..)),
        )
}

//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action the binary executes.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{site, ARG_DB_PASSWORD, ARG_DSN, ARG_PORT};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let db_password = matches
        .get_one::<String>(ARG_DB_PASSWORD)
        .cloned()
        .map(SecretString::from);

    let site_opts = site::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        db_password,
        base_url: site_opts.base_url,
        session_ttl_seconds: site_opts.session_ttl_seconds,
        remember_ttl_seconds: site_opts.remember_ttl_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn server_action_carries_site_options() {
        temp_env::with_vars(
            [
                ("SCRIPTFAN_DSN", Some("postgres://scriptfan@localhost/scriptfan")),
                ("SCRIPTFAN_DB_PASSWORD", Some("hunter2")),
                ("SCRIPTFAN_BASE_URL", Some("https://scriptfan.com")),
                ("SCRIPTFAN_PORT", None),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["scriptfan"]);
                let action = handler(&matches);
                assert!(action.is_ok());
                if let Ok(Action::Server(args)) = action {
                    assert_eq!(args.port, 8080);
                    assert_eq!(args.base_url, "https://scriptfan.com");
                    assert_eq!(
                        args.db_password.as_ref().map(|p| p.expose_secret().to_string()),
                        Some("hunter2".to_string())
                    );
                    assert_eq!(args.remember_ttl_seconds, 31_536_000);
                }
            },
        );
    }
}

pub mod logging;
pub mod site;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_DB_PASSWORD: &str = "db-password";

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

    let command = Command::new("scriptfan")
        .about("ScriptFan community accounts")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("SCRIPTFAN_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .env("SCRIPTFAN_DSN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_DB_PASSWORD)
                .long(ARG_DB_PASSWORD)
                .help("Database password, injected into the DSN")
                .long_help(
                    "Database password. When set it replaces any password in the DSN so the secret does not have to live in the connection string.",
                )
                .env("SCRIPTFAN_DB_PASSWORD")
                .hide_env_values(true),
        );

    let command = site::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "scriptfan");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("ScriptFan community accounts".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_check_port_and_dsn() {
        temp_env::with_vars(
            [
                ("SCRIPTFAN_PORT", None::<&str>),
                ("SCRIPTFAN_DSN", None),
                ("SCRIPTFAN_BASE_URL", None),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec![
                    "scriptfan",
                    "--port",
                    "8081",
                    "--dsn",
                    "postgres://scriptfan@localhost:5432/scriptfan",
                    "--base-url",
                    "https://scriptfan.com",
                ]);

                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(8081));
                assert_eq!(
                    matches.get_one::<String>(ARG_DSN).cloned(),
                    Some("postgres://scriptfan@localhost:5432/scriptfan".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>(site::ARG_BASE_URL).cloned(),
                    Some("https://scriptfan.com".to_string())
                );
                assert_eq!(
                    matches
                        .get_one::<i64>(site::ARG_SESSION_TTL_SECONDS)
                        .copied(),
                    Some(43_200)
                );
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("SCRIPTFAN_PORT", Some("443")),
                (
                    "SCRIPTFAN_DSN",
                    Some("postgres://scriptfan@localhost:5432/scriptfan"),
                ),
                ("SCRIPTFAN_DB_PASSWORD", Some("secret")),
                ("SCRIPTFAN_REMEMBER_TTL_SECONDS", Some("86400")),
                ("SCRIPTFAN_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["scriptfan"]);
                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>(ARG_DB_PASSWORD).cloned(),
                    Some("secret".to_string())
                );
                assert_eq!(
                    matches
                        .get_one::<i64>(site::ARG_REMEMBER_TTL_SECONDS)
                        .copied(),
                    Some(86_400)
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_session_ttl_lower_bound() {
        let command = new();
        let result = command.try_get_matches_from(vec![
            "scriptfan",
            "--dsn",
            "postgres://localhost/scriptfan",
            "--session-ttl-seconds",
            "5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("SCRIPTFAN_LOG_LEVEL", Some(level)),
                    ("SCRIPTFAN_DSN", Some("postgres://localhost/scriptfan")),
                ],
                || {
                    let command = new();
                    let matches = command.get_matches_from(vec!["scriptfan"]);
                    assert_eq!(
                        matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                        u8::try_from(index).ok()
                    );
                },
            );
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5_usize {
            temp_env::with_vars([("SCRIPTFAN_LOG_LEVEL", None::<String>)], || {
                let mut args = vec![
                    "scriptfan".to_string(),
                    "--dsn".to_string(),
                    "postgres://localhost/scriptfan".to_string(),
                ];

                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }
}

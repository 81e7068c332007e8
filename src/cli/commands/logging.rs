use clap::{builder::ValueParser, Arg, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Accepts `0`-`4` or a level name; both map onto the `-v` count.
fn parse_log_level(level: &str) -> std::result::Result<u8, String> {
    if let Ok(count) = level.parse::<u8>() {
        return if count <= 4 {
            Ok(count)
        } else {
            Err(format!("log level {count} is out of range (0-4)"))
        };
    }

    match level.to_lowercase().as_str() {
        "error" => Ok(0),
        "warn" => Ok(1),
        "info" => Ok(2),
        "debug" => Ok(3),
        "trace" => Ok(4),
        _ => Err(format!("invalid log level: {level}")),
    }
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_log_level)
}

/// `-v` may be repeated; `SCRIPTFAN_LOG_LEVEL` sets the same count by name.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log more: -v WARN, -vv INFO, -vvv DEBUG, -vvvv TRACE (default: ERROR)")
            .env("SCRIPTFAN_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

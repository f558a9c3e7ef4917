//! Logging setup for the `turnward` binary.
//!
//! The battle crates log at the level picked by `-v`; everything else
//! stays at `warn`. `TURNWARD_LOG_LEVEL` replaces the whole filter. Human
//! output stamps each line with the time since start so log lines read as
//! a battle timeline.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::uptime;

use crate::cli::args::ColorChoice;

/// Targets whose level follows `-v`.
const BATTLE_TARGETS: [&str; 2] = ["turnward", "turnward_core"];

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Readable lines with optional ANSI colors.
    #[default]
    Human,
    /// One flattened JSON object per event.
    Json,
}

/// Level for the battle targets at a given `-v` count.
#[must_use]
pub const fn battle_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Filter used when `TURNWARD_LOG_LEVEL` is unset.
///
/// `-q` keeps only errors; otherwise dependencies stay at `warn` and the
/// battle targets follow `verbosity`.
#[must_use]
pub fn filter_directive(verbosity: u8, quiet: bool) -> String {
    if quiet {
        return "error".to_owned();
    }
    let level = battle_level(verbosity);
    std::iter::once("warn".to_owned())
        .chain(BATTLE_TARGETS.iter().map(|target| format!("{target}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global subscriber on stderr. Later calls are ignored.
pub fn init_logging(format: LogFormat, verbosity: u8, quiet: bool, color: ColorChoice) {
    let filter = EnvFilter::try_from_env("TURNWARD_LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity, quiet)));
    let show_target = verbosity >= 2;

    match format {
        LogFormat::Human => {
            let use_ansi = match color {
                ColorChoice::Auto => {
                    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
                }
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            };
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_timer(uptime())
                .with_ansi(use_ansi)
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .flatten_event(true)
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_scopes_verbosity_to_battle_crates() {
        assert_eq!(
            filter_directive(1, false),
            "warn,turnward=info,turnward_core=info"
        );
        assert_eq!(
            filter_directive(255, false),
            "warn,turnward=trace,turnward_core=trace"
        );
    }

    #[test]
    fn quiet_wins_over_verbosity() {
        assert_eq!(filter_directive(3, true), "error");
    }

    #[test]
    fn every_directive_parses() {
        for verbosity in 0..=4 {
            for quiet in [false, true] {
                let directive = filter_directive(verbosity, quiet);
                assert!(EnvFilter::try_new(&directive).is_ok(), "{directive}");
            }
        }
    }

    #[test]
    fn init_logging_is_repeatable() {
        init_logging(LogFormat::Human, 0, false, ColorChoice::Auto);
        init_logging(LogFormat::Json, 3, true, ColorChoice::Never);
    }
}

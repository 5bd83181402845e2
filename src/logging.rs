// src/logging.rs

//! `tracing` subscriber setup.
//!
//! The filter comes from `--log-level` if given, otherwise from `STEPBOX_LOG`
//! (full `EnvFilter` syntax, e.g. `stepbox::exec=debug,info`), otherwise
//! `info`. Output goes to stderr; stdout belongs to dry-run listings.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "STEPBOX_LOG";

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    fmt()
        .with_env_filter(build_filter(cli_level, std::env::var(LOG_ENV).ok()))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("initialising logging: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env_value: Option<String>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.directive());
    }
    env_value
        .and_then(|value| EnvFilter::try_new(value.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_environment() {
        let filter = build_filter(Some(LogLevel::Trace), Some("error".into()));
        assert_eq!(filter.to_string(), "trace");
    }

    #[test]
    fn environment_directives_are_kept() {
        let filter = build_filter(None, Some("stepbox::exec=debug".into()));
        assert_eq!(filter.to_string(), "stepbox::exec=debug");
    }

    #[test]
    fn unparsable_environment_falls_back_to_info() {
        assert_eq!(build_filter(None, Some("stepbox=loud".into())).to_string(), "info");
        assert_eq!(build_filter(None, None).to_string(), "info");
    }
}

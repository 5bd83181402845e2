// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `stepbox`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stepbox",
    version,
    about = "Run workflow steps whose actions execute in Singularity or Docker containers.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the workflow file (TOML).
    ///
    /// Default: `Stepbox.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Stepbox.toml")]
    pub config: String,

    /// Run only the step with this name.
    #[arg(long, value_name = "NAME")]
    pub step: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// Overrides `STEPBOX_LOG` when given.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate and print every container command without executing it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter directive for this level.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

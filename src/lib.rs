// src/lib.rs

pub mod action;
pub mod backend;
pub mod cli;
pub mod command;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod image;
pub mod logging;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::backend::BackendRegistry;
use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::engine::{ActionDispatcher, DispatcherConfig, run_workflow};
use crate::exec::{CancelSignal, DryRunRunner, ProcessRunner, TokioProcessRunner};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - workflow file loading
/// - the backend registry (read-only once built)
/// - the process runner (real, or dry-run)
/// - the dispatcher and step loop
/// - Ctrl-C forwarding to running container processes
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let workflow = load_and_validate(&config_path)?;

    let registry = Arc::new(BackendRegistry::with_defaults());

    let runner: Arc<dyn ProcessRunner> = if args.dry_run {
        Arc::new(DryRunRunner)
    } else {
        Arc::new(TokioProcessRunner::new())
    };

    let mut dispatcher_config = DispatcherConfig::from_section(&workflow.config);
    dispatcher_config.workdir = workflow_root_dir(&config_path);
    dispatcher_config.require_available = !args.dry_run;

    let dispatcher = ActionDispatcher::new(registry, runner, dispatcher_config);

    // Ctrl-C → terminate the running process group, then stop.
    let (cancel_handle, cancel) = CancelSignal::pair();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        cancel_handle.cancel();
    });

    let summary = run_workflow(&workflow, &dispatcher, args.step.as_deref(), cancel).await?;
    info!(
        steps = summary.steps_run,
        actions = summary.actions_run,
        "workflow complete"
    );
    Ok(())
}

/// Directory relative paths in the workflow file are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "pipelines/Stepbox.toml"),
///   we use that directory, made absolute so it can be used as a mount source.
/// - If it's just a bare filename, we fall back to the current working
///   directory.
fn workflow_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::path::absolute(parent).unwrap_or_else(|_| parent.to_path_buf())
        }
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

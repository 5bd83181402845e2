// src/exec/dry_run.rs

use std::future::Future;
use std::pin::Pin;

use tracing::info;

use crate::command::Invocation;
use crate::errors::Result;
use crate::exec::{CancelSignal, ProcessResult, ProcessRunner};

/// Runner that prints each command instead of spawning it.
#[derive(Debug, Clone, Default)]
pub struct DryRunRunner;

impl ProcessRunner for DryRunRunner {
    fn execute<'a>(
        &'a self,
        invocation: &'a Invocation,
        _cancel: CancelSignal,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessResult>> + Send + 'a>> {
        Box::pin(async move {
            info!(workdir = %invocation.workdir.display(), "dry-run: {}", invocation.argv);
            println!("{}", invocation.argv);
            Ok(ProcessResult::default())
        })
    }
}

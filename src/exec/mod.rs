// src/exec/mod.rs

//! Process execution layer.
//!
//! Runs an [`Invocation`] as an external process and reports a
//! [`ProcessResult`]. A non-zero exit is data here, not an error; deciding
//! what counts as failure is the dispatcher's job.
//!
//! - [`runner`] holds the production [`TokioProcessRunner`].
//! - [`dry_run`] holds a runner that only logs what it would execute.
//! - [`result`] holds [`ProcessResult`] and its helpers.
//!
//! Tests swap in their own [`ProcessRunner`] to record invocations without
//! spawning anything.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::watch;

use crate::command::Invocation;
use crate::errors::Result;

pub mod dry_run;
pub mod result;
pub mod runner;

pub use dry_run::DryRunRunner;
pub use result::{OutputLine, ProcessResult};
pub use runner::TokioProcessRunner;

/// Trait abstracting how an invocation is executed.
///
/// The returned future completes only when the process has exited (or was
/// killed); callers are blocked for the whole duration of the action.
pub trait ProcessRunner: Send + Sync {
    fn execute<'a>(
        &'a self,
        invocation: &'a Invocation,
        cancel: CancelSignal,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessResult>> + Send + 'a>>;
}

/// Receiving side of a cancellation request.
///
/// Cheap to clone; every clone observes the same request.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

/// Sending side of a cancellation request.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx: Some(rx) })
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve once cancellation is requested. Pends forever if the handle
    /// was dropped without cancelling.
    pub async fn cancelled(&mut self) {
        match self.rx.as_mut() {
            Some(rx) => {
                if rx.wait_for(|c| *c).await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending::<()>().await,
        }
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers may all be gone; nothing left to cancel then.
        let _ = self.tx.send(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: Some(self.tx.subscribe()),
        }
    }
}

use std::collections::VecDeque;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::Barrier;
use stepbox::command::Invocation;
use stepbox::errors::Result;
use stepbox::exec::{CancelSignal, ProcessResult, ProcessRunner};

/// One call seen by [`SpyRunner`].
#[derive(Debug, Clone)]
pub struct RecordedInvocation {
    pub invocation: Invocation,
    /// Contents of every argument that named an existing file at call time.
    pub files: Vec<(PathBuf, String)>,
}

impl RecordedInvocation {
    pub fn argv(&self) -> &[String] {
        self.invocation.argv.as_slice()
    }

    pub fn file_contents(&self, path: &Path) -> Option<&str> {
        self.files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, c)| c.as_str())
    }
}

/// A process runner that:
/// - records every invocation (and snapshots the temp files it points at)
/// - never spawns anything
/// - reports a queued exit code (default 0) with canned stderr.
#[derive(Debug, Clone, Default)]
pub struct SpyRunner {
    calls: Arc<Mutex<Vec<RecordedInvocation>>>,
    exit_codes: Arc<Mutex<VecDeque<i32>>>,
    stderr: Vec<u8>,
    barrier: Option<Arc<Barrier>>,
}

impl SpyRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call exits with `exit_code` and prints `stderr`.
    pub fn failing(exit_code: i32, stderr: &str) -> Self {
        let runner = Self {
            stderr: stderr.as_bytes().to_vec(),
            ..Self::default()
        };
        runner.exit_codes.lock().unwrap().push_back(exit_code);
        runner
    }

    /// Queue exit codes for successive calls; once drained, calls exit 0
    /// (or with the last `failing` code).
    pub fn with_exit_codes(self, codes: &[i32]) -> Self {
        self.exit_codes.lock().unwrap().extend(codes.iter().copied());
        self
    }

    /// Make every call wait until `parties` calls are in flight.
    pub fn with_barrier(mut self, parties: usize) -> Self {
        self.barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    pub fn calls(&self) -> Vec<RecordedInvocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_exit_code(&self) -> i32 {
        let mut codes = self.exit_codes.lock().unwrap();
        if codes.len() > 1 {
            codes.pop_front().unwrap_or(0)
        } else {
            codes.front().copied().unwrap_or(0)
        }
    }
}

impl ProcessRunner for SpyRunner {
    fn execute<'a>(
        &'a self,
        invocation: &'a Invocation,
        _cancel: CancelSignal,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessResult>> + Send + 'a>> {
        Box::pin(async move {
            let files = invocation
                .argv
                .as_slice()
                .iter()
                .map(PathBuf::from)
                .filter(|p| p.is_file())
                .filter_map(|p| std::fs::read_to_string(&p).ok().map(|c| (p, c)))
                .collect();

            {
                let mut guard = self.calls.lock().unwrap();
                guard.push(RecordedInvocation {
                    invocation: invocation.clone(),
                    files,
                });
            }

            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }

            Ok(ProcessResult {
                exit_code: self.next_exit_code(),
                stderr: self.stderr.clone(),
                ..Default::default()
            })
        })
    }
}

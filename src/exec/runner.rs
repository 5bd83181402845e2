// src/exec/runner.rs

//! Production process runner built on `tokio::process`.

use std::future::Future;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::command::Invocation;
use crate::errors::{ActionError, Result};
use crate::exec::{CancelSignal, OutputLine, ProcessResult, ProcessRunner};
use crate::types::OutputStream;

/// Host variables every spawned process inherits.
pub const PASSTHROUGH_ENV: &[&str] = &[
    "PATH", "HOME", "USER", "LOGNAME", "LANG", "LC_ALL", "TERM", "TMPDIR",
];

/// How long a terminated process group gets before it is killed outright.
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// How long output is still collected after the child exits. A background
/// grandchild may hold the pipes open indefinitely.
const OUTPUT_DRAIN: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for TokioProcessRunner {
    fn execute<'a>(
        &'a self,
        invocation: &'a Invocation,
        cancel: CancelSignal,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessResult>> + Send + 'a>> {
        Box::pin(run_process(invocation, cancel))
    }
}

/// Why the runner stopped waiting on the child.
enum Stop {
    Exited(ExitStatus),
    Interrupted(String),
}

/// Build the controlled environment: pass-through list, backend prefixes,
/// then the invocation's own overrides.
pub fn controlled_env(invocation: &Invocation) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = std::env::vars()
        .filter(|(name, _)| {
            PASSTHROUGH_ENV.contains(&name.as_str())
                || invocation
                    .inherit_prefixes
                    .iter()
                    .any(|p| name.starts_with(p.as_str()))
        })
        .collect();
    env.extend(invocation.env.iter().cloned());
    env
}

async fn run_process(invocation: &Invocation, mut cancel: CancelSignal) -> Result<ProcessResult> {
    let command_line = invocation.argv.to_string();
    let program = invocation.argv.program().to_string();
    if program.is_empty() {
        return Err(ActionError::SpawnFailed {
            program,
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argument vector"),
        });
    }

    info!(command = %command_line, workdir = %invocation.workdir.display(), "starting process");

    let mut cmd = Command::new(&program);
    cmd.args(invocation.argv.args())
        .current_dir(&invocation.workdir)
        .env_clear()
        .envs(controlled_env(invocation))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group so a cancel reaches everything the tool forks.
    #[cfg(unix)]
    cmd.process_group(0);

    let started = Instant::now();
    let mut child = cmd
        .spawn()
        .map_err(|source| ActionError::SpawnFailed {
            program: program.clone(),
            source,
        })?;

    let (tx, rx) = mpsc::unbounded_channel::<OutputLine>();
    if let Some(stdout) = child.stdout.take() {
        pump(stdout, OutputStream::Stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        pump(stderr, OutputStream::Stderr, tx.clone());
    }
    drop(tx);
    let (exited_tx, exited_rx) = oneshot::channel();
    let collector = tokio::spawn(collect(rx, exited_rx));

    let deadline = async {
        match invocation.timeout {
            Some(t) => tokio::time::sleep(t).await,
            None => std::future::pending::<()>().await,
        }
    };

    let stop = tokio::select! {
        status = child.wait() => Stop::Exited(status?),
        _ = cancel.cancelled() => Stop::Interrupted("cancelled".to_string()),
        _ = deadline => Stop::Interrupted(format!(
            "timed out after {:.1}s",
            invocation.timeout.unwrap_or_default().as_secs_f64()
        )),
    };

    let status = match stop {
        Stop::Exited(status) => status,
        Stop::Interrupted(reason) => {
            info!(command = %command_line, %reason, "terminating process group");
            terminate(&mut child).await;
            collector.abort();
            return Err(ActionError::Interrupted {
                command: command_line,
                reason,
            });
        }
    };

    // Receiver gone means the collector already finished.
    let _ = exited_tx.send(());
    let (stdout, stderr, interleaved) = collector.await.map_err(anyhow::Error::from)?;
    let duration = started.elapsed();

    if let Some(signal) = killed_by(&status) {
        return Err(ActionError::Interrupted {
            command: command_line,
            reason: format!("killed by signal {signal}"),
        });
    }

    let exit_code = status.code().unwrap_or(-1);
    info!(
        command = %command_line,
        exit_code,
        success = status.success(),
        duration_ms = duration.as_millis() as u64,
        "process exited"
    );

    Ok(ProcessResult {
        exit_code,
        stdout,
        stderr,
        interleaved,
        duration,
    })
}

/// Forward one pipe line by line; raw bytes, no UTF-8 assumption.
fn pump<R>(reader: R, stream: OutputStream, tx: mpsc::UnboundedSender<OutputLine>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        loop {
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    debug!(?stream, "{}", String::from_utf8_lossy(&line).trim_end());
                    if tx.send(OutputLine { stream, line }).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(?stream, error = %e, "failed reading process output");
                    break;
                }
            }
        }
    });
}

/// Gather pumped lines until both pipes close, or until [`OUTPUT_DRAIN`]
/// after `exited` fires.
async fn collect(
    mut rx: mpsc::UnboundedReceiver<OutputLine>,
    exited: oneshot::Receiver<()>,
) -> (Vec<u8>, Vec<u8>, Vec<OutputLine>) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut interleaved = Vec::new();

    let drain_deadline = async {
        match exited.await {
            Ok(()) => tokio::time::sleep(OUTPUT_DRAIN).await,
            Err(_) => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(drain_deadline);

    loop {
        let line = tokio::select! {
            line = rx.recv() => line,
            _ = &mut drain_deadline => {
                warn!("output pipes still open after exit, dropping remaining output");
                None
            }
        };
        let Some(line) = line else {
            break;
        };
        match line.stream {
            OutputStream::Stdout => stdout.extend_from_slice(&line.line),
            OutputStream::Stderr => stderr.extend_from_slice(&line.line),
        }
        interleaved.push(line);
    }
    (stdout, stderr, interleaved)
}

#[cfg(unix)]
fn killed_by(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn killed_by(_status: &ExitStatus) -> Option<i32> {
    None
}

/// SIGTERM the process group, then SIGKILL it if it outlives the grace period.
#[cfg(unix)]
async fn terminate(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    let group = Pid::from_raw(pid as i32);

    if let Err(e) = killpg(group, Signal::SIGTERM) {
        debug!(pid, error = %e, "SIGTERM to process group failed");
    }
    if tokio::time::timeout(TERMINATE_GRACE, child.wait()).await.is_ok() {
        return;
    }
    if let Err(e) = killpg(group, Signal::SIGKILL) {
        warn!(pid, error = %e, "SIGKILL to process group failed");
    }
    if let Err(e) = child.kill().await {
        warn!(pid, error = %e, "failed to kill child process");
    }
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill child process");
    }
}

//! `sh -c` executor with a hard timeout

use super::{CommandExecutor, ExecFailure, ExecResult, FailureKind};
use crate::process_guard::{CommandProcessGroup, send_signal_to_group, with_registry};
use nix::sys::signal::Signal;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for output once the deadline has passed. A descendant
/// that left the process group can hold the pipes open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Runs commands through `sh -c` in their own process group.
///
/// Stdin is closed so a command waiting for input fails instead of hanging
/// until the timeout. On timeout the whole process group is killed, and
/// output still held open by escaped descendants is abandoned.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    timeout: Duration,
}

impl ShellExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll the child until it exits or the deadline passes.
    ///
    /// Returns `Ok(None)` on timeout, after the process group was killed.
    fn wait_with_deadline(
        child: &mut Child,
        deadline: Instant,
    ) -> std::io::Result<Option<ExitStatus>> {
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                if send_signal_to_group(child.id(), Signal::SIGKILL).is_err() {
                    let _ = child.kill();
                }
                let _ = child.wait();
                return Ok(None);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).trim().to_string());
    });
    rx
}

/// Output of a drain thread, or empty if it is still blocked past the deadline
fn collect(output: &Receiver<String>, deadline: Instant) -> String {
    let wait = deadline
        .saturating_duration_since(Instant::now())
        .max(DRAIN_GRACE);
    output.recv_timeout(wait).unwrap_or_else(|_| {
        tracing::debug!("Output pipe still open after deadline, discarding");
        String::new()
    })
}

impl CommandExecutor for ShellExecutor {
    fn execute(&self, command: &str, verbose: bool) -> ExecResult {
        if verbose {
            tracing::info!("Executing: {}", command);
        } else {
            tracing::debug!(command, "executing");
        }

        let spawned = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .in_new_process_group()
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                if verbose {
                    tracing::info!("Failed to spawn: {}", e);
                }
                return ExecResult::failure(
                    FailureKind::Spawn(e.kind()),
                    format!("Failed to spawn command: {}", e),
                );
            }
        };

        let deadline = Instant::now() + self.timeout;
        let pid = child.id();
        with_registry(|registry| registry.register(pid));

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let waited = Self::wait_with_deadline(&mut child, deadline);
        with_registry(|registry| registry.unregister(pid));

        let stdout = collect(&stdout, deadline);
        let stderr = collect(&stderr, deadline);

        if verbose {
            if !stdout.is_empty() {
                tracing::info!("Output: {}", stdout);
            }
            if !stderr.is_empty() {
                tracing::info!("Error output: {}", stderr);
            }
        }

        let result = match waited {
            Err(e) => ExecResult::failure(
                FailureKind::Spawn(e.kind()),
                format!("Failed waiting for command: {}", e),
            ),
            Ok(None) => ExecResult::failure(
                FailureKind::Timeout,
                format!("Command timed out after {}s", self.timeout.as_secs()),
            ),
            Ok(Some(status)) if status.success() => ExecResult::ok(stdout),
            Ok(Some(status)) => {
                let message = if !stderr.is_empty() {
                    stderr
                } else if !stdout.is_empty() {
                    stdout.clone()
                } else {
                    match status.code() {
                        Some(code) => format!("Command exited with code {}", code),
                        None => "Command terminated by signal".to_string(),
                    }
                };
                ExecResult {
                    success: false,
                    output: stdout,
                    error: Some(ExecFailure::new(
                        FailureKind::NonZeroExit(status.code()),
                        message,
                    )),
                }
            }
        };

        if verbose && !result.success {
            tracing::info!("Failed: {}", result.error_message());
        }

        result
    }
}

//! Deadline-bounded external tool invocation.
//!
//! Every external tool the pipeline touches runs through [`run_tool`]: piped
//! output drained by reader threads, a uniform deadline enforced by polling
//! `try_wait`, and the child killed and reaped on expiry. Exit status policy
//! stays with the caller: the search tool treats exit code 1 as a successful
//! empty result, which must not be classified as a failure here.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::ExtractError;

/// Deadline applied to every external tool invocation.
pub const TOOL_DEADLINE: Duration = Duration::from_secs(30);

/// How often the runner checks whether the child has exited.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured result of a completed tool invocation.
#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `tool` with `args` from `cwd`, killing it after `timeout`.
///
/// Classification: a missing binary is `ToolUnavailable`, a deadline expiry
/// is `ToolTimeout`, any other spawn or wait failure is `ToolFailed`. A
/// non-zero exit is not an error at this layer; the status is returned for
/// the caller to judge.
pub(crate) fn run_tool(
    tool: &str,
    args: &[&str],
    cwd: &Path,
    timeout: Duration,
) -> Result<ToolOutput, ExtractError> {
    trace!(tool, ?args, cwd = %cwd.display(), "invoking tool");

    let mut child = Command::new(tool)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ExtractError::tool_unavailable(tool),
            _ => {
                ExtractError::tool_failed(tool, format!("failed to spawn: {e}"))
            }
        })?;

    // Drain both pipes off-thread so a chatty child never blocks on a full
    // pipe while we wait for it to exit.
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                // Kill closes the pipes, so the readers run to EOF.
                let _ = child.kill();
                let _ = child.wait();
                let _ = stdout_reader.join();
                let _ = stderr_reader.join();
                return Err(ExtractError::tool_timeout(tool, timeout));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExtractError::tool_failed(
                    tool,
                    format!("wait failed: {e}"),
                ));
            }
        }
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();
    trace!(tool, %status, stdout_bytes = stdout.len(), "tool finished");

    Ok(ToolOutput {
        status,
        stdout,
        stderr,
    })
}

/// Reads a child pipe to EOF on a separate thread.
///
/// Invalid UTF-8 is replaced rather than failed: per-record parsing layers
/// already tolerate damaged records.
fn spawn_reader<R: Read + Send + 'static>(
    source: Option<R>,
) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

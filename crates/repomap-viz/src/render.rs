//! SVG rendering through external layout engines.
//!
//! The DOT source goes into a scratch file and the engine renders into a
//! second scratch beside the destination, renamed over it only on
//! success; both scratch files are removed on every exit path, so a
//! failed or killed engine never leaves a partial diagram behind.
//! Engines get the same deadline treatment as the extraction tools:
//! killed and reaped on expiry.

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::VizError;

/// Deadline applied to every layout engine invocation.
pub(crate) const RENDER_DEADLINE: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Layout engine selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Engine {
    /// Spring-model layout; keeps large sparse graphs readable.
    Fdp,
    /// Hierarchical layout for directed graphs.
    Dot,
}

impl Engine {
    fn command(self) -> &'static str {
        match self {
            Engine::Fdp => "fdp",
            Engine::Dot => "dot",
        }
    }
}

/// Renders `source` to `output` as SVG.
pub(crate) fn render_svg(
    engine: Engine,
    source: &str,
    output: &Path,
) -> Result<(), VizError> {
    render_with(engine.command(), source, output)
}

fn render_with(
    tool: &str,
    source: &str,
    output: &Path,
) -> Result<(), VizError> {
    let mut scratch = NamedTempFile::new()?;
    scratch.write_all(source.as_bytes())?;
    scratch.flush()?;

    // The engine writes next to the destination; the rename happens only
    // after a clean exit, so a prior diagram survives any failure.
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let rendered = NamedTempFile::new_in(dir)?;

    let mut command = Command::new(tool);
    command
        .arg("-Tsvg")
        .arg("-o")
        .arg(rendered.path())
        .arg(scratch.path());
    await_renderer(&mut command, tool, RENDER_DEADLINE)?;

    rendered.persist(output).map_err(|e| VizError::io(e.error))?;
    debug!(engine = tool, output = %output.display(), "rendered diagram");
    Ok(())
}

/// Runs the prepared engine command to completion under `timeout`.
///
/// Stdout is discarded (the SVG goes to the output file); stderr is
/// drained on a thread so an engine spewing warnings cannot stall on a
/// full pipe, then folded into the failure detail.
fn await_renderer(
    command: &mut Command,
    tool: &str,
    timeout: Duration,
) -> Result<(), VizError> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                VizError::unavailable(tool)
            } else {
                VizError::io(e)
            }
        })?;

    let stderr = drain_stderr(&mut child);
    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                kill_and_reap(&mut child);
                return Err(VizError::timeout(tool, timeout));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(VizError::io(e));
            }
        }
    };

    let stderr = stderr.join().unwrap_or_default();
    if status.success() {
        return Ok(());
    }
    let stderr = stderr.trim();
    let detail = if stderr.is_empty() {
        status.to_string()
    } else {
        format!("{status} ({stderr})")
    };
    Err(VizError::failed(tool, detail))
}

fn drain_stderr(child: &mut Child) -> thread::JoinHandle<String> {
    let stream = child.stderr.take();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

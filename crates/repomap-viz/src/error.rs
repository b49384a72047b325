//! Error type for diagram rendering.
//!
//! Covers scratch-file I/O and the three ways a layout engine invocation
//! can go wrong: the binary is missing, it exits non-zero, or it outlives
//! its deadline.

use std::time::Duration;
use std::{fmt, io};

/// Errors that can occur while rendering a diagram.
#[derive(Debug)]
pub struct VizError {
    kind: VizErrorKind,
}

#[derive(Debug)]
enum VizErrorKind {
    /// Scratch-file or output I/O failed.
    Io(io::Error),
    /// The layout engine binary could not be found.
    Unavailable { tool: String },
    /// The layout engine exited non-zero.
    Failed { tool: String, detail: String },
    /// The layout engine outlived its deadline and was killed.
    Timeout { tool: String, timeout: Duration },
}

impl VizError {
    pub(crate) fn unavailable(tool: &str) -> Self {
        Self {
            kind: VizErrorKind::Unavailable {
                tool: tool.to_string(),
            },
        }
    }

    pub(crate) fn failed(tool: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: VizErrorKind::Failed {
                tool: tool.to_string(),
                detail: detail.into(),
            },
        }
    }

    pub(crate) fn timeout(tool: &str, timeout: Duration) -> Self {
        Self {
            kind: VizErrorKind::Timeout {
                tool: tool.to_string(),
                timeout,
            },
        }
    }

    pub(crate) fn io(err: io::Error) -> Self {
        Self {
            kind: VizErrorKind::Io(err),
        }
    }

    /// True when the error is a scratch-file or output I/O failure.
    pub fn is_io(&self) -> bool {
        matches!(self.kind, VizErrorKind::Io(_))
    }

    /// True when the layout engine binary was not found.
    pub fn is_unavailable(&self) -> bool {
        matches!(self.kind, VizErrorKind::Unavailable { .. })
    }

    /// True when the layout engine exited non-zero.
    pub fn is_failed(&self) -> bool {
        matches!(self.kind, VizErrorKind::Failed { .. })
    }

    /// True when the layout engine was killed at its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, VizErrorKind::Timeout { .. })
    }
}

impl fmt::Display for VizError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            VizErrorKind::Io(e) => write!(f, "I/O error: {e}"),
            VizErrorKind::Unavailable { tool } => {
                write!(f, "{tool} is not installed or not on PATH")
            }
            VizErrorKind::Failed { tool, detail } => {
                write!(f, "{tool} failed: {detail}")
            }
            VizErrorKind::Timeout { tool, timeout } => {
                write!(f, "{tool} exceeded the {}s deadline", timeout.as_secs())
            }
        }
    }
}

impl std::error::Error for VizError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            VizErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for VizError {
    fn from(err: io::Error) -> Self {
        Self::io(err)
    }
}

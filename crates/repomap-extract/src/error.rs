//! Error types for the repomap-extract crate.

use std::backtrace::Backtrace;
use std::fmt;
use std::time::Duration;

/// Longest raw record excerpt carried inside a malformed-record error.
const RECORD_EXCERPT_LEN: usize = 120;

/// Error type for the extraction stages.
///
/// Stage failures never abort the pipeline; the caller degrades the failing
/// stage to an empty map and logs the error. Malformed-record errors are
/// constructed per record, logged at trace level, and skipped; they are
/// never returned from a stage.
#[derive(Debug)]
pub struct ExtractError {
    kind: ExtractErrorKind,
    backtrace: Backtrace,
}

/// Internal error variants. Not exposed publicly; use `is_xxx()` methods instead.
#[derive(Debug)]
pub(crate) enum ExtractErrorKind {
    /// The external tool binary could not be found.
    ToolUnavailable { tool: String },
    /// The external tool ran but failed (unexpected exit status, unreadable
    /// output, or a pattern its engine rejected).
    ToolFailed { tool: String, detail: String },
    /// The external tool exceeded its deadline and was killed.
    ToolTimeout { tool: String, timeout: Duration },
    /// A tag row or search record could not be parsed.
    ParseMalformed { record: String },
    /// The symbol table is empty, so there is nothing to search for.
    EmptyInput,
}

impl ExtractError {
    /// Creates an error from an error kind, capturing a backtrace.
    pub(crate) fn new(kind: ExtractErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    pub(crate) fn tool_unavailable(tool: impl Into<String>) -> Self {
        Self::new(ExtractErrorKind::ToolUnavailable { tool: tool.into() })
    }

    pub(crate) fn tool_failed(
        tool: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::new(ExtractErrorKind::ToolFailed {
            tool: tool.into(),
            detail: detail.into(),
        })
    }

    pub(crate) fn tool_timeout(tool: impl Into<String>, timeout: Duration) -> Self {
        Self::new(ExtractErrorKind::ToolTimeout {
            tool: tool.into(),
            timeout,
        })
    }

    pub(crate) fn parse_malformed(record: &str) -> Self {
        let mut excerpt: String =
            record.chars().take(RECORD_EXCERPT_LEN).collect();
        if excerpt.len() < record.len() {
            excerpt.push('…');
        }
        Self::new(ExtractErrorKind::ParseMalformed { record: excerpt })
    }

    pub(crate) fn empty_input() -> Self {
        Self::new(ExtractErrorKind::EmptyInput)
    }

    /// Returns true if the tool binary was missing.
    pub fn is_tool_unavailable(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::ToolUnavailable { .. })
    }

    /// Returns true if the tool ran but failed.
    pub fn is_tool_failed(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::ToolFailed { .. })
    }

    /// Returns true if the tool was killed on deadline.
    pub fn is_tool_timeout(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::ToolTimeout { .. })
    }

    /// Returns true if a record failed to parse.
    pub fn is_parse_malformed(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::ParseMalformed { .. })
    }

    /// Returns true if there were no symbols to search for.
    pub fn is_empty_input(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::EmptyInput)
    }

    /// Returns the backtrace captured when this error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for ExtractErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractErrorKind::ToolUnavailable { tool } => {
                write!(f, "{tool} is not installed or not on PATH")
            }
            ExtractErrorKind::ToolFailed { tool, detail } => {
                write!(f, "{tool} failed: {detail}")
            }
            ExtractErrorKind::ToolTimeout { tool, timeout } => {
                write!(f, "{tool} exceeded the {}s deadline", timeout.as_secs())
            }
            ExtractErrorKind::ParseMalformed { record } => {
                write!(f, "unparsable record: {record}")
            }
            ExtractErrorKind::EmptyInput => {
                write!(f, "no function definitions available to seed the call search")
            }
        }
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Summary of what happened.
        writeln!(f, "{}", self.kind)?;

        // Backtrace (will be empty unless RUST_BACKTRACE is set).
        write!(f, "{}", self.backtrace)
    }
}

impl std::error::Error for ExtractError {}

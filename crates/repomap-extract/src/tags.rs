//! Access to the external source-tagging tool.

use std::fs;
use std::path::Path;
use std::process;
use std::time::Duration;

use tempfile::TempPath;
use tracing::debug;

use crate::error::ExtractError;
use crate::subprocess::{run_tool, ToolOutput, TOOL_DEADLINE};

/// Binary name of the tagging tool.
pub const TAGGING_TOOL: &str = "ctags";

/// Source of raw tags text for a repository.
///
/// The symbol stage is written against this interface so tag parsing and
/// duplicate handling are testable without a tagger installed.
pub trait TagSource {
    /// Returns tab-separated tags text covering every function definition
    /// under `repo`.
    fn function_tags(&self, repo: &Path) -> Result<String, ExtractError>;
}

/// Subprocess-backed tag source driving `ctags`.
///
/// The tags file is written under a unique dot-prefixed name directly in the
/// repository root and `-o` receives the relative name: paths recorded in
/// the tags file are then root-relative, in the same form the search tool
/// reports match paths. The definition-site exclusion compares the two as
/// plain strings. A temp-path guard removes the file on every exit path.
#[derive(Debug, Clone)]
pub struct CtagsTagSource {
    timeout: Duration,
}

impl CtagsTagSource {
    pub fn new() -> Self {
        Self {
            timeout: TOOL_DEADLINE,
        }
    }
}

impl Default for CtagsTagSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TagSource for CtagsTagSource {
    fn function_tags(&self, repo: &Path) -> Result<String, ExtractError> {
        // Process id keeps concurrent runs over the same tree from
        // clobbering each other's tags file.
        let file_name = format!(".repomap-{}.tags", process::id());
        let guard =
            TempPath::try_from_path(repo.join(&file_name)).map_err(|e| {
                ExtractError::tool_failed(
                    TAGGING_TOOL,
                    format!("cannot reserve the tags path: {e}"),
                )
            })?;

        let output = run_tool(
            TAGGING_TOOL,
            &["-R", "--fields=+S", "--c-kinds=f", "-o", &file_name],
            repo,
            self.timeout,
        )?;
        if !output.status.success() {
            return Err(tool_failure(&output));
        }

        let text = fs::read_to_string(&guard).map_err(|e| {
            ExtractError::tool_failed(
                TAGGING_TOOL,
                format!("unreadable tags file: {e}"),
            )
        })?;
        debug!(bytes = text.len(), "collected tags");
        Ok(text)
        // The guard drops here, removing the tags file.
    }
}

/// In-process tag source returning canned tags text.
#[derive(Debug, Clone, Default)]
pub struct StaticTagSource {
    text: String,
}

impl StaticTagSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl TagSource for StaticTagSource {
    fn function_tags(&self, _repo: &Path) -> Result<String, ExtractError> {
        Ok(self.text.clone())
    }
}

fn tool_failure(output: &ToolOutput) -> ExtractError {
    let stderr = output.stderr.trim();
    let detail = if stderr.is_empty() {
        output.status.to_string()
    } else {
        format!("{} ({stderr})", output.status)
    };
    ExtractError::tool_failed(TAGGING_TOOL, detail)
}

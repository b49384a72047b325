//! Access to the external text-search tool.
//!
//! Two search shapes cover everything the pipeline needs: a single-capture
//! regex scan (include directives) and a whole-word scan over a set of
//! names (call candidates). Both are restricted to C-family files and
//! report one record per matching line.
//!
//! The subprocess implementation drives `rg --json`; the in-process one
//! scans an in-memory file map with the same observable behavior, so the
//! stages can be exercised without external binaries.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use aho_corasick::{AhoCorasick, MatchKind};
use itertools::Itertools;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::ExtractError;
use crate::subprocess::{run_tool, ToolOutput, TOOL_DEADLINE};

/// Binary name of the search tool.
pub const SEARCH_TOOL: &str = "rg";

/// Search-tool exit code meaning "no matches": success with an empty result.
const NO_MATCHES_EXIT: i32 = 1;

/// One record from a search: a matching line and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    /// Matched file, relative to the repository root.
    pub path: String,
    /// 1-based line number, when the backend reports one.
    pub line_number: Option<u32>,
    /// Text of the matched line, without its terminator.
    pub line: String,
    /// First capture group, for capture searches.
    pub capture: Option<String>,
}

/// Text search over a repository's C-family files.
pub trait TextSearch {
    /// Runs `pattern` (carrying one capture group) and yields at most one
    /// capture per matching line.
    fn captures(
        &self,
        repo: &Path,
        pattern: &str,
    ) -> Result<Vec<SearchMatch>, ExtractError>;

    /// Finds lines containing any of `names` as a whole word. One record
    /// per line, however many names occur in it.
    fn word_matches(
        &self,
        repo: &Path,
        names: &[&str],
    ) -> Result<Vec<SearchMatch>, ExtractError>;
}

/// Builds `\b(name1|name2|…)\b` with every name escaped.
///
/// A single alternation scans the corpus once for all names; the search
/// tool's regex engine lowers large literal alternations onto an
/// Aho-Corasick automaton, so this stays linear at thousands of names.
fn word_alternation(names: &[&str]) -> String {
    let alternation = names.iter().map(|name| regex::escape(name)).join("|");
    format!(r"\b({alternation})\b")
}

// ---------------------------------------------------------------------
// Subprocess implementation
// ---------------------------------------------------------------------

/// Subprocess-backed search driving `rg --json`.
#[derive(Debug, Clone)]
pub struct RipgrepSearch {
    timeout: Duration,
}

impl RipgrepSearch {
    pub fn new() -> Self {
        Self {
            timeout: TOOL_DEADLINE,
        }
    }

    fn run(
        &self,
        repo: &Path,
        pattern: &str,
    ) -> Result<Vec<SearchMatch>, ExtractError> {
        let output = run_tool(
            SEARCH_TOOL,
            &["--json", "--type", "c", "--regexp", pattern],
            repo,
            self.timeout,
        )?;
        check_search_status(&output)?;
        Ok(parse_events(&output.stdout))
    }
}

impl Default for RipgrepSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSearch for RipgrepSearch {
    fn captures(
        &self,
        repo: &Path,
        pattern: &str,
    ) -> Result<Vec<SearchMatch>, ExtractError> {
        let re = Regex::new(pattern).map_err(|e| {
            ExtractError::tool_failed(SEARCH_TOOL, format!("invalid pattern: {e}"))
        })?;
        let matches = self.run(repo, pattern)?;

        // The tool's submatch spans cover the whole pattern, not the group,
        // so the capture is re-derived from the line text.
        Ok(matches
            .into_iter()
            .filter_map(|mut m| {
                let capture = re.captures(&m.line)?.get(1)?.as_str().to_string();
                m.capture = Some(capture);
                Some(m)
            })
            .collect())
    }

    fn word_matches(
        &self,
        repo: &Path,
        names: &[&str],
    ) -> Result<Vec<SearchMatch>, ExtractError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        self.run(repo, &word_alternation(names))
    }
}

/// Exit 0 is matches, exit 1 is a clean empty result, anything else failed.
fn check_search_status(output: &ToolOutput) -> Result<(), ExtractError> {
    match output.status.code() {
        Some(0) | Some(NO_MATCHES_EXIT) => Ok(()),
        _ => {
            let stderr = output.stderr.trim();
            let detail = if stderr.is_empty() {
                output.status.to_string()
            } else {
                format!("{} ({stderr})", output.status)
            };
            Err(ExtractError::tool_failed(SEARCH_TOOL, detail))
        }
    }
}

/// One line of `rg --json` output.
#[derive(Deserialize)]
struct Event {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct MatchData {
    path: Text,
    line_number: Option<u32>,
    lines: Text,
}

/// Text payload; the `bytes` form used for invalid UTF-8 is absent here,
/// which fails the record and drops it.
#[derive(Deserialize)]
struct Text {
    text: String,
}

/// Decodes the event stream, keeping `match` events and dropping the rest.
fn parse_events(stdout: &str) -> Vec<SearchMatch> {
    let mut matches = Vec::new();
    let mut skipped = 0usize;

    for line in stdout.lines() {
        if line.is_empty() {
            continue;
        }
        match parse_event(line) {
            Ok(Some(m)) => matches.push(m),
            Ok(None) => {}
            Err(e) => {
                trace!(error = %e, "skipping search record");
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        debug!(skipped, "skipped unparsable search records");
    }
    matches
}

fn parse_event(line: &str) -> Result<Option<SearchMatch>, ExtractError> {
    let event: Event = serde_json::from_str(line)
        .map_err(|_| ExtractError::parse_malformed(line))?;
    if event.kind != "match" {
        return Ok(None);
    }
    let data: MatchData = serde_json::from_value(event.data)
        .map_err(|_| ExtractError::parse_malformed(line))?;

    Ok(Some(SearchMatch {
        path: data.path.text,
        line_number: data.line_number,
        line: data
            .lines
            .text
            .trim_end_matches('\n')
            .trim_end_matches('\r')
            .to_string(),
        capture: None,
    }))
}

// ---------------------------------------------------------------------
// In-process implementation
// ---------------------------------------------------------------------

/// In-process search over an in-memory file map.
///
/// Keys are root-relative paths. Only `.c` and `.h` files are scanned,
/// mirroring the subprocess implementation's C-family restriction.
#[derive(Debug, Clone, Default)]
pub struct MemorySearch {
    files: BTreeMap<String, String>,
}

impl MemorySearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, returning `self` for chained construction.
    #[must_use]
    pub fn with_file(
        mut self,
        path: impl Into<String>,
        contents: impl Into<String>,
    ) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

impl TextSearch for MemorySearch {
    fn captures(
        &self,
        _repo: &Path,
        pattern: &str,
    ) -> Result<Vec<SearchMatch>, ExtractError> {
        let re = Regex::new(pattern).map_err(|e| {
            ExtractError::tool_failed(
                "memory-search",
                format!("invalid pattern: {e}"),
            )
        })?;

        let mut matches = Vec::new();
        for (path, contents) in &self.files {
            if !is_c_family(path) {
                continue;
            }
            for (index, line) in contents.lines().enumerate() {
                let Some(caps) = re.captures(line) else {
                    continue;
                };
                matches.push(SearchMatch {
                    path: path.clone(),
                    line_number: u32::try_from(index + 1).ok(),
                    line: line.to_string(),
                    capture: caps.get(1).map(|g| g.as_str().to_string()),
                });
            }
        }
        Ok(matches)
    }

    fn word_matches(
        &self,
        _repo: &Path,
        names: &[&str],
    ) -> Result<Vec<SearchMatch>, ExtractError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        // Leftmost-longest, so a name that is a prefix of another
        // (png_read / png_read_row) cannot shadow the longer whole-word hit.
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostLongest)
            .build(names)
            .map_err(|e| {
                ExtractError::tool_failed(
                    "memory-search",
                    format!("invalid name set: {e}"),
                )
            })?;

        let mut matches = Vec::new();
        for (path, contents) in &self.files {
            if !is_c_family(path) {
                continue;
            }
            for (index, line) in contents.lines().enumerate() {
                let hit = automaton
                    .find_iter(line)
                    .any(|m| is_whole_word(line, m.start(), m.end()));
                if hit {
                    matches.push(SearchMatch {
                        path: path.clone(),
                        line_number: u32::try_from(index + 1).ok(),
                        line: line.to_string(),
                        capture: None,
                    });
                }
            }
        }
        Ok(matches)
    }
}

fn is_c_family(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext == "c" || ext == "h")
}

/// C identifier boundary check around a byte span of `line`.
fn is_whole_word(line: &str, start: usize, end: usize) -> bool {
    let before = line[..start].chars().next_back();
    let after = line[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

//! Symbol table extraction: tags text → code map.
//!
//! Tag rows are tab-separated: `name`, `file`, a location pattern, a kind
//! letter, then optional `key:value` extension fields. The tagger is run
//! with pattern locations rather than explicit line numbers, so the line is
//! recovered from the first digit run embedded in the pattern and is often
//! absent. Malformed rows are skipped, never fatal.

use std::path::Path;

use repomap_schemas::{CodeMap, LineNumber, SymbolDefinition};
use tracing::{debug, instrument, trace, warn};

use crate::error::ExtractError;
use crate::tags::TagSource;

/// A usable tag row has at least name, file, pattern, and kind.
const MIN_TAG_FIELDS: usize = 4;

/// Rows opening with this marker are tagger metadata, not symbols.
const META_PREFIX: &str = "!_";

/// Extension field carrying the parameter list.
const SIGNATURE_FIELD: &str = "signature:";

/// Builds the symbol table for `repo` from a tag source.
#[instrument(skip(source))]
pub fn extract_symbols(
    repo: &Path,
    source: &dyn TagSource,
) -> Result<CodeMap, ExtractError> {
    let text = source.function_tags(repo)?;
    Ok(parse_tags(&text))
}

/// Parses tags text into a code map.
///
/// Duplicate names resolve last-write-wins, with a warning naming both
/// definition sites; rows arrive in tag-file order, so the outcome is
/// deterministic for a given tags file.
fn parse_tags(text: &str) -> CodeMap {
    let mut code_map = CodeMap::new();
    let mut skipped = 0usize;

    for row in text.lines() {
        if row.is_empty() || row.starts_with(META_PREFIX) {
            continue;
        }
        let (name, definition) = match parse_tag_row(row) {
            Ok(parsed) => parsed,
            Err(e) => {
                trace!(error = %e, "skipping tag row");
                skipped += 1;
                continue;
            }
        };
        if let Some(previous) = code_map.get(&name) {
            warn!(
                symbol = %name,
                kept = %definition.file,
                replaced = %previous.file,
                "duplicate function name; keeping the later definition"
            );
        }
        code_map.insert(name, definition);
    }

    debug!(symbols = code_map.len(), skipped, "parsed tags");
    code_map
}

/// Parses one tag row into `(name, definition)`.
fn parse_tag_row(row: &str) -> Result<(String, SymbolDefinition), ExtractError> {
    let fields: Vec<&str> = row.split('\t').collect();
    if fields.len() < MIN_TAG_FIELDS {
        return Err(ExtractError::parse_malformed(row));
    }
    let name = fields[0];
    let file = fields[1];
    let pattern = fields[2];

    let line =
        first_digit_run(pattern).map_or(LineNumber::Unavailable, LineNumber::Line);

    // The signature field holds only the parameter list; the stored form is
    // the name with the parameters appended, or the bare name without one.
    let signature = fields[3..]
        .iter()
        .find_map(|field| field.strip_prefix(SIGNATURE_FIELD))
        .map_or_else(|| name.to_string(), |params| format!("{name}{params}"));

    Ok((
        name.to_string(),
        SymbolDefinition {
            file: file.to_string(),
            line,
            signature,
        },
    ))
}

/// First run of ASCII digits in `pattern`, if it fits a `u32`.
fn first_digit_run(pattern: &str) -> Option<u32> {
    let start = pattern.find(|c: char| c.is_ascii_digit())?;
    let run: &str = pattern[start..]
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .unwrap_or_default();
    run.parse().ok()
}

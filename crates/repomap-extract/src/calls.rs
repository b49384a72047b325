//! Approximate caller-to-callee extraction.
//!
//! A textual approximation, not a parse: every line mentioning a known
//! function name as a whole word is a candidate call site. The token just
//! before the line's first `(` decides which name is charged, and a hit on
//! the definition line itself is discarded. Calls through macros or
//! function pointers are invisible, and a mention in a comment or string
//! counts; the result is a map of likely call relations, no more.

use std::path::Path;

use tracing::{debug, instrument};

use repomap_schemas::{CallMap, CodeMap, LineNumber};

use crate::error::ExtractError;
use crate::search::TextSearch;

/// Builds the call map by searching for every known function name.
///
/// Fails with an empty-input error before running any search when
/// `code_map` has no entries, since a seedless search would scan the
/// whole repository for nothing.
#[instrument(skip(code_map, search))]
pub fn approximate_calls(
    repo: &Path,
    code_map: &CodeMap,
    search: &dyn TextSearch,
) -> Result<CallMap, ExtractError> {
    if code_map.is_empty() {
        return Err(ExtractError::empty_input());
    }

    let names: Vec<&str> = code_map.keys().map(String::as_str).collect();
    let matches = search.word_matches(repo, &names)?;

    let mut calls = CallMap::new();
    let mut excluded = 0usize;
    for m in matches {
        let Some(candidate) = call_candidate(&m.line) else {
            continue;
        };
        let Some(definition) = code_map.get(candidate) else {
            // The head token is not a known symbol; whatever name matched
            // sits elsewhere on the line (argument, expression, comment).
            continue;
        };
        let is_definition_site = match (m.line_number, definition.line) {
            (Some(line_number), LineNumber::Line(def_line)) => {
                definition.file == m.path && def_line == line_number
            }
            _ => false,
        };
        // The file's entry exists from the first known-name hit onward,
        // including a hit on the definition line: a file defining
        // functions nobody calls still appears, with an empty call set.
        let callees = calls.entry(m.path).or_default();
        if is_definition_site {
            excluded += 1;
            continue;
        }
        callees.insert(candidate.to_string());
    }

    debug!(files = calls.len(), excluded, "approximated call relations");
    Ok(calls)
}

/// Last whitespace-separated token before the line's first `(`.
///
/// Without any `(` the whole trimmed line is the head, so a bare mention
/// still produces a candidate.
fn call_candidate(line: &str) -> Option<&str> {
    line.trim()
        .split('(')
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .next_back()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use repomap_schemas::SymbolDefinition;

    use crate::search::{MemorySearch, SearchMatch};

    fn definition(file: &str, line: LineNumber, signature: &str) -> SymbolDefinition {
        SymbolDefinition {
            file: file.to_string(),
            line,
            signature: signature.to_string(),
        }
    }

    // -----------------------------------------------------------------
    // Candidate selection
    // -----------------------------------------------------------------

    #[test]
    fn head_token_before_first_paren_is_the_candidate() {
        assert_eq!(call_candidate("  png_read(p);"), Some("png_read"));
        assert_eq!(
            call_candidate("ptr = png_malloc(png_ptr, size);"),
            Some("png_malloc")
        );
    }

    #[test]
    fn wrapping_construct_hides_the_call() {
        // The head token is "if"; the real callee is invisible to this
        // approximation.
        assert_eq!(call_candidate("if (png_read(p))"), Some("if"));
    }

    #[test]
    fn only_the_first_call_on_a_line_is_charged() {
        assert_eq!(
            call_candidate("png_free(ptr), png_read(q);"),
            Some("png_free")
        );
    }

    #[test]
    fn parenless_line_keeps_its_punctuation() {
        assert_eq!(
            call_candidate("png_handle_unknown;"),
            Some("png_handle_unknown;")
        );
    }

    #[test]
    fn blank_line_has_no_candidate() {
        assert_eq!(call_candidate("   "), None);
        assert_eq!(call_candidate(""), None);
    }

    // -----------------------------------------------------------------
    // Whole-map behavior
    // -----------------------------------------------------------------

    /// Fails the test if any search runs at all.
    struct PanicSearch;

    impl TextSearch for PanicSearch {
        fn captures(
            &self,
            _repo: &Path,
            _pattern: &str,
        ) -> Result<Vec<SearchMatch>, ExtractError> {
            panic!("searched with an empty symbol table");
        }

        fn word_matches(
            &self,
            _repo: &Path,
            _names: &[&str],
        ) -> Result<Vec<SearchMatch>, ExtractError> {
            panic!("searched with an empty symbol table");
        }
    }

    #[test]
    fn empty_code_map_fails_before_searching() {
        let err = approximate_calls(Path::new("."), &CodeMap::new(), &PanicSearch)
            .unwrap_err();
        assert!(err.is_empty_input());
    }

    #[test]
    fn call_site_in_another_file_is_recorded() {
        let mut code_map = CodeMap::new();
        code_map.insert(
            "png_read".to_string(),
            definition("pngread.c", LineNumber::Line(10), "png_read(png_structp p)"),
        );
        let search = MemorySearch::new()
            .with_file("caller.c", "void f(void) {\n  png_read(p);\n}\n");

        let calls =
            approximate_calls(Path::new("."), &code_map, &search).unwrap();

        assert_eq!(calls.len(), 1);
        assert!(calls["caller.c"].contains("png_read"));
    }

    #[test]
    fn definition_site_is_not_a_call() {
        let mut code_map = CodeMap::new();
        code_map.insert(
            "png_read".to_string(),
            definition("pngread.c", LineNumber::Line(1), "png_read(png_structp p)"),
        );
        let search = MemorySearch::new()
            .with_file("pngread.c", "int png_read(png_structp p)\n{\n}\n");

        let calls =
            approximate_calls(Path::new("."), &code_map, &search).unwrap();

        assert!(
            calls["pngread.c"].is_empty(),
            "the defining line must not be charged as a call"
        );
    }

    #[test]
    fn definition_only_file_keeps_an_empty_entry() {
        let mut code_map = CodeMap::new();
        code_map.insert(
            "solo".to_string(),
            definition("solo.c", LineNumber::Line(1), "solo(void)"),
        );
        let search = MemorySearch::new().with_file("solo.c", "int solo(void)\n");

        let calls =
            approximate_calls(Path::new("."), &code_map, &search).unwrap();

        assert!(
            calls.contains_key("solo.c"),
            "a file whose only match is its own definition keeps an entry"
        );
        assert!(calls["solo.c"].is_empty());
    }

    #[test]
    fn unlocated_definition_still_collects_calls() {
        // A definition without a line number can never coincide with a
        // match, so even a hit in its own file on its own line counts.
        let mut code_map = CodeMap::new();
        code_map.insert(
            "png_read".to_string(),
            definition("pngread.c", LineNumber::Unavailable, "png_read(p)"),
        );
        let search =
            MemorySearch::new().with_file("pngread.c", "png_read(p)\n");

        let calls =
            approximate_calls(Path::new("."), &code_map, &search).unwrap();

        assert!(calls["pngread.c"].contains("png_read"));
    }

    #[test]
    fn recursive_use_elsewhere_in_the_file_is_recorded() {
        let mut code_map = CodeMap::new();
        code_map.insert(
            "walk".to_string(),
            definition("walk.c", LineNumber::Line(1), "walk(node *n)"),
        );
        let search = MemorySearch::new()
            .with_file("walk.c", "int walk(node *n)\n{\n  walk(n->next);\n}\n");

        let calls =
            approximate_calls(Path::new("."), &code_map, &search).unwrap();

        assert!(calls["walk.c"].contains("walk"));
    }

    #[test]
    fn callees_come_out_sorted() {
        let mut code_map = CodeMap::new();
        for name in ["zeta", "alpha", "mid"] {
            code_map.insert(
                name.to_string(),
                definition("defs.c", LineNumber::Unavailable, name),
            );
        }
        let search = MemorySearch::new()
            .with_file("caller.c", "zeta(1);\nmid(2);\nalpha(3);\n");

        let calls =
            approximate_calls(Path::new("."), &code_map, &search).unwrap();
        let callees: Vec<_> = calls["caller.c"].iter().collect();

        assert_eq!(callees, vec!["alpha", "mid", "zeta"]);
    }

    proptest! {
        #[test]
        fn approximation_stays_within_known_symbols(
            names in prop::collection::btree_set("[a-z][a-z0-9_]{0,8}", 1..6),
            junk in prop::collection::vec("[ -~]{0,30}", 0..6),
            call_count in 0usize..6,
        ) {
            let mut code_map = CodeMap::new();
            let mut defs = String::new();
            for (index, name) in names.iter().enumerate() {
                defs.push_str(&format!("int {name}(void) {{\n"));
                code_map.insert(
                    name.clone(),
                    definition(
                        "defs.c",
                        LineNumber::Line(u32::try_from(index + 1).unwrap()),
                        &format!("{name}(void)"),
                    ),
                );
            }

            let mut caller = String::new();
            for name in names.iter().cycle().take(call_count) {
                caller.push_str(&format!("  {name}(7);\n"));
            }
            for line in &junk {
                caller.push_str(line);
                caller.push('\n');
            }

            let search = MemorySearch::new()
                .with_file("defs.c", defs)
                .with_file("caller.c", caller);
            let calls =
                approximate_calls(Path::new("."), &code_map, &search).unwrap();

            if let Some(callees) = calls.get("defs.c") {
                prop_assert!(
                    callees.is_empty(),
                    "definition lines alone must not produce callees"
                );
            }
            for callees in calls.values() {
                for callee in callees {
                    prop_assert!(code_map.contains_key(callee));
                }
            }
            if call_count > 0 {
                prop_assert!(calls.contains_key("caller.c"));
            }
        }
    }
}

//! Extraction of a structural index from a C source tree.
//!
//! Three stages, each feeding one section of the structure map:
//!
//! 1. [`extract_symbols`] lists function definition sites from a tags run.
//! 2. [`extract_includes`] records which files each file includes.
//! 3. [`approximate_calls`] searches for uses of the known function names.
//!
//! [`index_repository`] runs all three and degrades per stage: a stage
//! that fails contributes an empty section and the others still run, so a
//! missing external tool costs one section rather than the whole index.

mod calls;
mod error;
mod includes;
mod search;
mod subprocess;
mod symbols;
mod tags;

use std::path::Path;

use tracing::{instrument, warn};

use repomap_schemas::StructureMap;

#[doc(inline)]
pub use crate::calls::approximate_calls;
#[doc(inline)]
pub use crate::error::ExtractError;
#[doc(inline)]
pub use crate::includes::{extract_includes, INCLUDE_PATTERN};
#[doc(inline)]
pub use crate::search::{
    MemorySearch, RipgrepSearch, SearchMatch, TextSearch, SEARCH_TOOL,
};
#[doc(inline)]
pub use crate::subprocess::TOOL_DEADLINE;
#[doc(inline)]
pub use crate::symbols::extract_symbols;
#[doc(inline)]
pub use crate::tags::{CtagsTagSource, StaticTagSource, TagSource, TAGGING_TOOL};

/// Runs every extraction stage over `repo` and assembles the result.
///
/// Never fails: each stage's error is logged and replaced with an empty
/// section. Note the coupling between the first and last stages: when
/// symbol extraction fails, the call stage sees an empty code map and
/// reports empty input, so both sections come out empty.
#[instrument(skip(tags, search))]
pub fn index_repository(
    repo: &Path,
    tags: &dyn TagSource,
    search: &dyn TextSearch,
) -> StructureMap {
    let code_map = extract_symbols(repo, tags).unwrap_or_else(|e| {
        warn!(error = %e, "symbol extraction failed; continuing with an empty code map");
        Default::default()
    });
    let file_dependencies = extract_includes(repo, search).unwrap_or_else(|e| {
        warn!(error = %e, "include extraction failed; continuing with an empty dependency map");
        Default::default()
    });
    let call_map = approximate_calls(repo, &code_map, search).unwrap_or_else(|e| {
        warn!(error = %e, "call approximation failed; continuing with an empty call map");
        Default::default()
    });

    StructureMap {
        code_map,
        file_dependencies,
        call_map,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tag source whose tool is permanently broken.
    struct FailingTags;

    impl TagSource for FailingTags {
        fn function_tags(&self, _repo: &Path) -> Result<String, ExtractError> {
            Err(ExtractError::tool_unavailable(TAGGING_TOOL))
        }
    }

    /// Search whose tool is permanently broken.
    struct FailingSearch;

    impl TextSearch for FailingSearch {
        fn captures(
            &self,
            _repo: &Path,
            _pattern: &str,
        ) -> Result<Vec<SearchMatch>, ExtractError> {
            Err(ExtractError::tool_unavailable(SEARCH_TOOL))
        }

        fn word_matches(
            &self,
            _repo: &Path,
            _names: &[&str],
        ) -> Result<Vec<SearchMatch>, ExtractError> {
            Err(ExtractError::tool_unavailable(SEARCH_TOOL))
        }
    }

    const TAGS: &str = "\
parse\tparse.c\t/^int parse(char *s) {$/;\"\tf\tsignature:(char *s)
emit\temit.c\t/^void emit(void) {$/;\"\tf\tsignature:(void)
";

    fn source_files() -> MemorySearch {
        MemorySearch::new()
            .with_file(
                "parse.c",
                "#include \"emit.h\"\nint parse(char *s) {\n  emit();\n}\n",
            )
            .with_file("emit.c", "void emit(void) {\n}\n")
    }

    #[test]
    fn all_stages_populate_their_sections() {
        let map = index_repository(
            Path::new("."),
            &StaticTagSource::new(TAGS),
            &source_files(),
        );

        assert_eq!(map.code_map.len(), 2);
        assert_eq!(map.file_dependencies["parse.c"], vec!["emit.h"]);
        assert!(map.call_map["parse.c"].contains("emit"));
    }

    #[test]
    fn broken_tagging_empties_symbols_and_calls_but_not_includes() {
        let map = index_repository(Path::new("."), &FailingTags, &source_files());

        assert!(map.code_map.is_empty());
        assert!(
            map.call_map.is_empty(),
            "no symbols means nothing to search for"
        );
        assert_eq!(
            map.file_dependencies["parse.c"],
            vec!["emit.h"],
            "include extraction is independent of tagging"
        );
    }

    #[test]
    fn broken_search_empties_includes_and_calls_but_not_symbols() {
        let map = index_repository(
            Path::new("."),
            &StaticTagSource::new(TAGS),
            &FailingSearch,
        );

        assert_eq!(map.code_map.len(), 2);
        assert!(map.file_dependencies.is_empty());
        assert!(map.call_map.is_empty());
    }

    #[test]
    fn everything_broken_still_yields_a_map() {
        let map = index_repository(Path::new("."), &FailingTags, &FailingSearch);
        assert_eq!(map, StructureMap::default());
    }
}

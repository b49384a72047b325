//! Include-relation extraction.
//!
//! Scans every C-family file for `#include` directives and records which
//! files each one pulls in. The included name is taken verbatim from
//! between the delimiters, so `"pngpriv.h"` and `<zlib.h>` both land as
//! plain file names with no path resolution.

use std::path::Path;

use tracing::{debug, instrument, trace};

use repomap_schemas::DependencyMap;

use crate::error::ExtractError;
use crate::search::TextSearch;

/// Matches both delimiter forms; group 1 is the included name.
pub const INCLUDE_PATTERN: &str = r#"^#include\s*["<](.*)[">]"#;

/// Builds the file dependency map from the repository's include directives.
///
/// Entries keep source order and duplicates: the map records the directives
/// as written, one list element per directive.
#[instrument(skip(search))]
pub fn extract_includes(
    repo: &Path,
    search: &dyn TextSearch,
) -> Result<DependencyMap, ExtractError> {
    let matches = search.captures(repo, INCLUDE_PATTERN)?;

    let mut dependencies = DependencyMap::new();
    for m in matches {
        let Some(included) = m.capture else {
            trace!(path = %m.path, line = %m.line, "include match without a capture");
            continue;
        };
        dependencies.entry(m.path).or_default().push(included);
    }

    debug!(files = dependencies.len(), "extracted include relations");
    Ok(dependencies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::MemorySearch;

    fn extract(search: &MemorySearch) -> DependencyMap {
        extract_includes(Path::new("."), search).unwrap()
    }

    #[test]
    fn quoted_include_is_recorded() {
        let search =
            MemorySearch::new().with_file("a.c", "#include \"b.h\"\nint x;\n");
        let map = extract(&search);

        assert_eq!(map.len(), 1);
        assert_eq!(map["a.c"], vec!["b.h"]);
    }

    #[test]
    fn bracket_include_is_recorded() {
        let search =
            MemorySearch::new().with_file("png.c", "#include <zlib.h>\n");
        assert_eq!(extract(&search)["png.c"], vec!["zlib.h"]);
    }

    #[test]
    fn no_space_before_delimiter_still_matches() {
        let search = MemorySearch::new().with_file("a.c", "#include\"x.h\"\n");
        assert_eq!(extract(&search)["a.c"], vec!["x.h"]);
    }

    #[test]
    fn order_and_duplicates_are_preserved() {
        let search = MemorySearch::new().with_file(
            "png.c",
            "#include \"pngpriv.h\"\n#include <zlib.h>\n#include \"pngpriv.h\"\n",
        );
        assert_eq!(
            extract(&search)["png.c"],
            vec!["pngpriv.h", "zlib.h", "pngpriv.h"]
        );
    }

    #[test]
    fn indented_directive_is_ignored() {
        // The pattern is anchored at column zero.
        let search =
            MemorySearch::new().with_file("a.c", "  #include \"b.h\"\n");
        assert!(extract(&search).is_empty());
    }

    #[test]
    fn files_without_includes_have_no_entry() {
        let search = MemorySearch::new()
            .with_file("a.c", "#include \"b.h\"\n")
            .with_file("plain.c", "int main(void) { return 0; }\n");
        let map = extract(&search);

        assert!(map.contains_key("a.c"));
        assert!(!map.contains_key("plain.c"));
    }

    #[test]
    fn empty_repository_yields_empty_map() {
        assert!(extract(&MemorySearch::new()).is_empty());
    }
}

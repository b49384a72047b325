//! File dependency diagram.

use std::path::Path;

use tracing::{instrument, warn};

use repomap_schemas::DependencyMap;

use crate::dot::DotGraph;
use crate::error::VizError;
use crate::render::{render_svg, Engine};

/// Headers too widely included to be informative; dropped from the
/// diagram on both sides of every edge.
const SYSTEM_HEADERS: &[&str] = &[
    "stdio.h",
    "string.h",
    "stdlib.h",
    "stdarg.h",
    "ctype.h",
    "math.h",
    "setjmp.h",
    "time.h",
    "zlib.h",
    "png.h",
    "pngconf.h",
];

/// Exact-name comparison; a nested path like `contrib/png.h` is kept.
fn is_blocked(name: &str) -> bool {
    SYSTEM_HEADERS.contains(&name)
}

fn dependency_graph(dependencies: &DependencyMap) -> DotGraph {
    let mut graph = DotGraph::new("file_dependencies");
    graph.graph_attr("overlap", "false");
    graph.graph_attr("splines", "true");
    graph.node_default("shape", "box");
    graph.node_default("style", "rounded");

    for (file, includes) in dependencies {
        if is_blocked(file) {
            continue;
        }
        // A file left without a single drawable include stays as an
        // isolated node.
        graph.node(file);
        for included in includes {
            if is_blocked(included) {
                continue;
            }
            graph.node(included);
            graph.edge(file, included);
        }
    }
    graph
}

/// Renders the include relations to `output` with the `fdp` engine.
///
/// When filtering leaves nothing to draw, logs and writes no file.
#[instrument(skip(dependencies))]
pub fn render_dependency_diagram(
    dependencies: &DependencyMap,
    output: &Path,
) -> Result<(), VizError> {
    let graph = dependency_graph(dependencies);
    if graph.is_empty() {
        warn!(output = %output.display(), "no include relations to draw; skipping");
        return Ok(());
    }
    render_svg(Engine::Fdp, &graph.to_string(), output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(file: &str, includes: &[&str]) -> DependencyMap {
        let mut map = DependencyMap::new();
        map.insert(
            file.to_string(),
            includes.iter().map(|i| i.to_string()).collect(),
        );
        map
    }

    #[test]
    fn blocked_headers_vanish_from_nodes_and_edges() {
        let dependencies =
            entry("pngread.c", &["pngpriv.h", "zlib.h", "stdio.h"]);
        let source = dependency_graph(&dependencies).to_string();

        assert!(source.contains("\"pngread.c\" -> \"pngpriv.h\""));
        assert!(!source.contains("zlib.h"));
        assert!(!source.contains("stdio.h"));
    }

    #[test]
    fn blocked_includer_drops_its_whole_entry() {
        let dependencies = entry("png.h", &["pngpriv.h"]);
        assert!(dependency_graph(&dependencies).is_empty());
    }

    #[test]
    fn file_with_only_blocked_includes_stays_isolated() {
        let dependencies = entry("app.c", &["stdio.h", "stdlib.h"]);
        let source = dependency_graph(&dependencies).to_string();

        assert!(source.contains("\"app.c\""));
        assert!(!source.contains("stdio.h"));
        assert!(!source.contains("->"), "no edges survive the block list");
    }

    #[test]
    fn block_list_compares_whole_paths_so_nested_names_are_kept() {
        let dependencies = entry("contrib/png.h", &["custom.h"]);
        let source = dependency_graph(&dependencies).to_string();

        assert!(source.contains("\"contrib/png.h\" -> \"custom.h\""));
    }

    #[test]
    fn duplicate_includes_draw_duplicate_edges() {
        let dependencies = entry("a.c", &["b.h", "b.h"]);
        let source = dependency_graph(&dependencies).to_string();
        assert_eq!(source.matches("\"a.c\" -> \"b.h\"").count(), 2);
    }

    #[test]
    fn uses_the_sparse_layout_attributes() {
        let source = dependency_graph(&entry("a.c", &["b.h"])).to_string();
        assert!(source.contains("overlap=\"false\""));
        assert!(source.contains("splines=\"true\""));
        assert!(source.contains("node [shape=\"box\", style=\"rounded\"]"));
    }

    #[test]
    fn empty_result_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("file_dependencies.svg");

        render_dependency_diagram(&DependencyMap::new(), &output).unwrap();

        assert!(!output.exists());
    }
}

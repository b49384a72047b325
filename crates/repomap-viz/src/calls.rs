//! Call diagram with scope filtering.
//!
//! Caller files and callee functions are distinct node classes: files as
//! rounded blue boxes, functions as black ellipses. A scope narrows the
//! diagram to one caller file or one directory subtree; the whole graph
//! is the default.

use std::path::{Component, Path, PathBuf};

use tracing::{instrument, warn};

use repomap_schemas::CallMap;

use crate::dot::DotGraph;
use crate::error::VizError;
use crate::render::{render_svg, Engine};

/// Which slice of the call map a diagram covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallScope {
    /// Every caller file.
    Whole,
    /// Edges originating from a single file.
    File(String),
    /// Edges originating from files under a directory.
    Dir(String),
}

impl CallScope {
    fn selects(&self, caller: &str) -> bool {
        match self {
            CallScope::Whole => true,
            CallScope::File(file) => normalized(caller) == normalized(file),
            CallScope::Dir(dir) => {
                normalized(caller).starts_with(normalized(dir))
            }
        }
    }
}

/// Drops `.` components so `./pngread.c` selects the `pngread.c` entry.
///
/// Prefix checks are component-wise: `contrib/visupng` does not select
/// files under `contrib/visupng2`.
fn normalized(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn call_graph(calls: &CallMap, scope: &CallScope) -> DotGraph {
    let mut graph = DotGraph::new("call_map");
    graph.graph_attr("rankdir", "TB");
    graph.graph_attr("size", "20,20");
    graph.graph_attr("overlap", "false");
    graph.graph_attr("splines", "true");

    for (caller, callees) in calls {
        if !scope.selects(caller) {
            continue;
        }
        graph.styled_node(
            caller,
            &[("shape", "box"), ("style", "rounded"), ("color", "blue")],
        );
        for callee in callees {
            graph.styled_node(
                callee,
                &[("shape", "ellipse"), ("color", "black")],
            );
            graph.edge(caller, callee);
        }
    }
    graph
}

/// Renders the calls selected by `scope` to `output` with the `dot`
/// engine.
///
/// A scope that selects nothing (including a focus file absent from the
/// map) logs and writes no file.
#[instrument(skip(calls))]
pub fn render_call_diagram(
    calls: &CallMap,
    scope: &CallScope,
    output: &Path,
) -> Result<(), VizError> {
    let graph = call_graph(calls, scope);
    if graph.is_empty() {
        warn!(output = %output.display(), ?scope, "call scope selects nothing; skipping");
        return Ok(());
    }
    render_svg(Engine::Dot, &graph.to_string(), output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_calls() -> CallMap {
        let mut calls = CallMap::new();
        calls.insert(
            "pngread.c".to_string(),
            ["png_malloc".to_string(), "png_error".to_string()]
                .into_iter()
                .collect(),
        );
        calls.insert(
            "contrib/visupng/vis.c".to_string(),
            ["png_read_info".to_string()].into_iter().collect(),
        );
        calls.insert(
            "contrib/visupng2/other.c".to_string(),
            ["png_error".to_string()].into_iter().collect(),
        );
        calls
    }

    #[test]
    fn whole_scope_draws_every_caller() {
        let source = call_graph(&sample_calls(), &CallScope::Whole).to_string();

        assert!(source.contains("\"pngread.c\""));
        assert!(source.contains("\"contrib/visupng/vis.c\""));
        assert!(source.contains("\"pngread.c\" -> \"png_error\""));
    }

    #[test]
    fn node_classes_are_styled_apart() {
        let source = call_graph(&sample_calls(), &CallScope::Whole).to_string();

        assert!(source.contains(
            "\"pngread.c\" [shape=\"box\", style=\"rounded\", color=\"blue\"]"
        ));
        assert!(source
            .contains("\"png_malloc\" [shape=\"ellipse\", color=\"black\"]"));
    }

    #[test]
    fn file_scope_keeps_only_that_caller() {
        let scope = CallScope::File("pngread.c".to_string());
        let source = call_graph(&sample_calls(), &scope).to_string();

        assert!(source.contains("\"pngread.c\""));
        assert!(!source.contains("vis.c"));
    }

    #[test]
    fn file_scope_tolerates_a_leading_dot_segment() {
        let scope = CallScope::File("./pngread.c".to_string());
        assert!(!call_graph(&sample_calls(), &scope).is_empty());
    }

    #[test]
    fn dir_scope_matches_whole_components_only() {
        let scope = CallScope::Dir("contrib/visupng".to_string());
        let source = call_graph(&sample_calls(), &scope).to_string();

        assert!(source.contains("\"contrib/visupng/vis.c\""));
        assert!(
            !source.contains("visupng2"),
            "a sibling directory sharing the prefix must not be selected"
        );
    }

    #[test]
    fn absent_focus_file_writes_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("call_map_missing.svg");
        let scope = CallScope::File("no_such_file.c".to_string());

        render_call_diagram(&sample_calls(), &scope, &output).unwrap();

        assert!(!output.exists());
    }

    #[test]
    fn empty_map_is_a_no_op_for_every_scope() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("call_map.svg");

        render_call_diagram(&CallMap::new(), &CallScope::Whole, &output)
            .unwrap();

        assert!(!output.exists());
    }
}

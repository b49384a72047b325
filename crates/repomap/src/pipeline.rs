//! Pipeline orchestration: index, render, persist.
//!
//! Stage failures inside extraction already degrade to empty sections;
//! here a failed diagram render degrades to a warning. The only failure
//! that aborts the run is being unable to persist the artifact.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use itertools::Itertools;
use tempfile::NamedTempFile;
use tracing::{info, instrument, warn};

use repomap_extract::{index_repository, TagSource, TextSearch};
use repomap_schemas::StructureMap;
use repomap_viz::{render_call_diagram, render_dependency_diagram, CallScope};

/// What to index and where the outputs go.
#[derive(Debug, Clone)]
pub struct Options {
    /// Repository root to index.
    pub repo: PathBuf,
    /// Path of the merged JSON artifact.
    pub artifact: PathBuf,
    /// Directory receiving the SVG diagrams.
    pub diagram_dir: PathBuf,
    /// Call diagrams scoped to single files.
    pub focus_files: Vec<String>,
    /// Call diagrams scoped to directory subtrees.
    pub focus_dirs: Vec<String>,
}

/// Runs the whole pipeline and returns the assembled map.
///
/// Errors only when the artifact cannot be written; everything upstream
/// degrades with a diagnostic instead.
#[instrument(skip(tags, search))]
pub fn run(
    options: &Options,
    tags: &dyn TagSource,
    search: &dyn TextSearch,
) -> Result<StructureMap> {
    let map = index_repository(&options.repo, tags, search);
    info!(
        symbols = map.code_map.len(),
        files_with_includes = map.file_dependencies.len(),
        files_with_calls = map.call_map.len(),
        "indexed repository"
    );

    let dependency_output = options.diagram_dir.join("file_dependencies.svg");
    if let Err(e) =
        render_dependency_diagram(&map.file_dependencies, &dependency_output)
    {
        warn!(error = %e, "dependency diagram failed; continuing");
    }
    for (scope, output) in call_scopes(options) {
        if let Err(e) = render_call_diagram(&map.call_map, &scope, &output) {
            warn!(error = %e, ?scope, "call diagram failed; continuing");
        }
    }

    write_artifact(&map, &options.artifact)?;
    info!(artifact = %options.artifact.display(), "wrote structure map");
    Ok(map)
}

/// Expands the focus options into scoped diagrams, falling back to one
/// whole-graph diagram when no focus was given.
fn call_scopes(options: &Options) -> Vec<(CallScope, PathBuf)> {
    let mut scopes: Vec<(CallScope, PathBuf)> = options
        .focus_files
        .iter()
        .map(|file| CallScope::File(file.clone()))
        .chain(options.focus_dirs.iter().map(|dir| CallScope::Dir(dir.clone())))
        .map(|scope| {
            let output = options.diagram_dir.join(diagram_name(&scope));
            (scope, output)
        })
        .collect();
    if scopes.is_empty() {
        let output = options.diagram_dir.join(diagram_name(&CallScope::Whole));
        scopes.push((CallScope::Whole, output));
    }
    scopes
}

fn diagram_name(scope: &CallScope) -> String {
    match scope {
        CallScope::Whole => "call_map.svg".to_string(),
        CallScope::File(file) => {
            let label = focus_label(&Path::new(file).with_extension(""));
            format!("call_map_{label}.svg")
        }
        CallScope::Dir(dir) => {
            format!("call_map_{}.svg", focus_label(Path::new(dir)))
        }
    }
}

/// Joins the path's normal components with `_`, so `contrib/visupng`
/// labels its diagram `contrib_visupng`.
fn focus_label(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .join("_")
}

/// Persists the artifact atomically: serialize into a scratch file in the
/// destination directory, then rename over the final path. A prior
/// artifact survives any failure before the rename.
fn write_artifact(map: &StructureMap, path: &Path) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut scratch = NamedTempFile::new_in(dir).with_context(|| {
        format!("creating a scratch file in {}", dir.display())
    })?;
    serde_json::to_writer_pretty(&mut scratch, map)
        .context("serializing the structure map")?;
    writeln!(scratch).context("finishing the structure map")?;
    scratch
        .persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(focus_files: &[&str], focus_dirs: &[&str]) -> Options {
        Options {
            repo: PathBuf::from("."),
            artifact: PathBuf::from("code_structure.json"),
            diagram_dir: PathBuf::from("out"),
            focus_files: focus_files.iter().map(|s| s.to_string()).collect(),
            focus_dirs: focus_dirs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn no_focus_means_one_whole_graph_diagram() {
        let scopes = call_scopes(&options(&[], &[]));

        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].0, CallScope::Whole);
        assert_eq!(scopes[0].1, PathBuf::from("out/call_map.svg"));
    }

    #[test]
    fn focus_file_names_drop_the_extension() {
        let scopes = call_scopes(&options(&["pngread.c"], &[]));

        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].1, PathBuf::from("out/call_map_pngread.svg"));
    }

    #[test]
    fn focus_paths_flatten_separators() {
        let scopes = call_scopes(&options(
            &["contrib/visupng/vis.c"],
            &["contrib/visupng/"],
        ));

        assert_eq!(
            scopes[0].1,
            PathBuf::from("out/call_map_contrib_visupng_vis.svg")
        );
        assert_eq!(
            scopes[1].1,
            PathBuf::from("out/call_map_contrib_visupng.svg")
        );
    }

    #[test]
    fn any_focus_suppresses_the_whole_graph_diagram() {
        let scopes = call_scopes(&options(&[], &["contrib"]));

        assert_eq!(scopes.len(), 1);
        assert!(matches!(scopes[0].0, CallScope::Dir(_)));
    }

    #[test]
    fn artifact_is_pretty_printed_with_a_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code_structure.json");

        write_artifact(&StructureMap::default(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"code_map\""));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn artifact_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code_structure.json");
        std::fs::write(&path, "not json").unwrap();

        write_artifact(&StructureMap::default(), &path).unwrap();

        let parsed: StructureMap = serde_json::from_str(
            &std::fs::read_to_string(&path).unwrap(),
        )
        .unwrap();
        assert_eq!(parsed, StructureMap::default());
    }
}

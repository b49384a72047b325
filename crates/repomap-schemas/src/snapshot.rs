//! Read-only consumer view over a persisted structure map.
//!
//! Downstream tooling (question-answering agents, evaluation harnesses)
//! works against the artifact plus the raw repository files. A [`Snapshot`]
//! packages both: the parsed [`StructureMap`] and the repository root, with
//! every file read confined under that root. The snapshot is an owned,
//! immutable value passed by reference to consumers; there is no process
//! global to populate or invalidate.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::{CallMap, CodeMap, DependencyMap, StructureMap};

/// Errors from loading a snapshot or reading repository files through it.
#[derive(Debug)]
pub struct SnapshotError {
    kind: SnapshotErrorKind,
}

#[derive(Debug)]
enum SnapshotErrorKind {
    /// Reading the artifact or a repository file failed.
    Read { path: PathBuf, source: io::Error },
    /// The artifact was not a valid structure map.
    Parse(serde_json::Error),
    /// A requested path resolved outside the repository root.
    PathEscape { path: PathBuf },
}

impl SnapshotError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            kind: SnapshotErrorKind::Read {
                path: path.into(),
                source,
            },
        }
    }

    pub(crate) fn parse(source: serde_json::Error) -> Self {
        Self {
            kind: SnapshotErrorKind::Parse(source),
        }
    }

    pub(crate) fn path_escape(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: SnapshotErrorKind::PathEscape { path: path.into() },
        }
    }

    /// Returns true if this error is due to a failed file read.
    pub fn is_read(&self) -> bool {
        matches!(self.kind, SnapshotErrorKind::Read { .. })
    }

    /// Returns true if this error is due to an unparsable artifact.
    pub fn is_parse(&self) -> bool {
        matches!(self.kind, SnapshotErrorKind::Parse(_))
    }

    /// Returns true if this error is due to a path escaping the root.
    pub fn is_path_escape(&self) -> bool {
        matches!(self.kind, SnapshotErrorKind::PathEscape { .. })
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SnapshotErrorKind::Read { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            SnapshotErrorKind::Parse(e) => {
                write!(f, "failed to parse structure map: {e}")
            }
            SnapshotErrorKind::PathEscape { path } => {
                write!(
                    f,
                    "path escapes the repository root: {}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            SnapshotErrorKind::Read { source, .. } => Some(source),
            SnapshotErrorKind::Parse(e) => Some(e),
            SnapshotErrorKind::PathEscape { .. } => None,
        }
    }
}

/// A loaded structure map bound to the repository it describes.
#[derive(Debug, Clone)]
pub struct Snapshot {
    map: StructureMap,
    root: PathBuf,
}

impl Snapshot {
    /// Wraps an in-memory structure map.
    pub fn new(map: StructureMap, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            map,
            root: repo_root.into(),
        }
    }

    /// Loads and parses the artifact at `artifact`, binding it to `repo_root`.
    pub fn load(
        artifact: &Path,
        repo_root: impl Into<PathBuf>,
    ) -> Result<Self, SnapshotError> {
        let text = fs::read_to_string(artifact)
            .map_err(|e| SnapshotError::read(artifact, e))?;
        let map: StructureMap =
            serde_json::from_str(&text).map_err(SnapshotError::parse)?;
        debug!(
            artifact = %artifact.display(),
            symbols = map.code_map.len(),
            "loaded structure map"
        );
        Ok(Self::new(map, repo_root))
    }

    /// The full structure map.
    pub fn structure(&self) -> &StructureMap {
        &self.map
    }

    /// Function name → definition site.
    pub fn code_map(&self) -> &CodeMap {
        &self.map.code_map
    }

    /// File → included names.
    pub fn file_dependencies(&self) -> &DependencyMap {
        &self.map.file_dependencies
    }

    /// File → referenced function names.
    pub fn call_map(&self) -> &CallMap {
        &self.map.call_map
    }

    /// Reads a repository file by root-relative path.
    ///
    /// The path is resolved lexically before any filesystem access; absolute
    /// paths and paths whose normalized form leaves the root are rejected
    /// with a path-escape error rather than read.
    pub fn read_source(&self, relative: &str) -> Result<String, SnapshotError> {
        let resolved = confine(&self.root, relative)
            .ok_or_else(|| SnapshotError::path_escape(relative))?;
        fs::read_to_string(&resolved)
            .map_err(|e| SnapshotError::read(resolved, e))
    }
}

/// Resolves `relative` under `root`, or `None` if it would escape.
///
/// Normalization is lexical: `.` components drop, `..` pops a previously
/// accepted component and fails at the root boundary. Absolute paths and
/// drive prefixes never resolve.
fn confine(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut confined = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => confined.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !confined.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(root.join(confined))
}

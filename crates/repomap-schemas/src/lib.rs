//! Schema definitions for the repomap artifact.
//!
//! This crate contains the data structures that define repomap's output
//! format: the structure map merging a C repository's symbol table, include
//! relations, and approximate call relations. The same types are used by the
//! extraction pipeline when building the artifact and by downstream
//! consumers reading it back, so the serialization contract lives in exactly
//! one place.
//!
//! [`Snapshot`] is the consumer side: a loaded artifact bound to its
//! repository root, with path-confined file access.

mod snapshot;
mod structure_map;

#[doc(inline)]
pub use snapshot::*;
#[doc(inline)]
pub use structure_map::*;

//! Pipeline entry point behind the `repomap` binary.
//!
//! Kept as a library so the whole pipeline can be driven in-process with
//! in-memory tool implementations; the binary wires in the subprocess
//! ones.

mod pipeline;

#[doc(inline)]
pub use crate::pipeline::{run, Options};

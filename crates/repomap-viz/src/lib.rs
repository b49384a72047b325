//! Diagram rendering for structure maps.
//!
//! Turns the dependency and call sections of a structure map into SVG
//! files through Graphviz. Graph construction is pure and deterministic;
//! only the final layout step shells out, under the same deadline
//! discipline as the extraction tools. An empty filtered graph is a
//! logged no-op, never an error and never an empty output file.

mod calls;
mod deps;
mod dot;
mod error;
mod render;

#[doc(inline)]
pub use crate::calls::{render_call_diagram, CallScope};
#[doc(inline)]
pub use crate::deps::render_dependency_diagram;
#[doc(inline)]
pub use crate::error::VizError;

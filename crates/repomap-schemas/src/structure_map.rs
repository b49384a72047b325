//! Structure map schema for the indexed view of a C repository.
//!
//! The structure map is the single artifact the pipeline produces: function
//! definition sites keyed by symbol name, per-file include lists, and the
//! approximate per-file call sets. It is serialized as pretty-printed JSON
//! and consumed read-only by downstream tooling (see [`crate::Snapshot`]).
//!
//! All maps are `BTreeMap`s and call sets are `BTreeSet`s so that
//! serialization order is fully determined by the data: indexing an
//! unchanged tree twice yields byte-identical artifacts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Symbol table: function name → definition site.
///
/// Symbol names are unique; when a repository defines the same function name
/// in several translation units, the entry from the latest tag row wins.
pub type CodeMap = BTreeMap<String, SymbolDefinition>;

/// Include relations: file path → included names in source order.
///
/// Values are the include arguments exactly as written (`"png.h"` stays
/// `png.h`, never resolved to a path), with duplicates preserved.
pub type DependencyMap = BTreeMap<String, Vec<String>>;

/// Approximate call relations: file path → referenced function names.
///
/// Sets serialize as sorted JSON arrays.
pub type CallMap = BTreeMap<String, BTreeSet<String>>;

/// Sentinel used when a tag row carries no recoverable line number.
const UNAVAILABLE: &str = "N/A";

/// A source line number recovered from a tag row's location pattern.
///
/// Tag rows locate symbols with an embedded search pattern rather than an
/// explicit line field, so the line number is recovered from the first digit
/// run in that pattern and is frequently absent. Serializes as a JSON
/// integer, or the string `"N/A"` when unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineNumber {
    /// A concrete 1-based line number.
    Line(u32),
    /// No digit run was present in the location pattern.
    Unavailable,
}

impl Serialize for LineNumber {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            LineNumber::Line(n) => s.serialize_u32(*n),
            LineNumber::Unavailable => s.serialize_str(UNAVAILABLE),
        }
    }
}

impl<'de> Deserialize<'de> for LineNumber {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct LineNumberVisitor;

        impl Visitor<'_> for LineNumberVisitor {
            type Value = LineNumber;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a line number or \"{UNAVAILABLE}\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<LineNumber, E> {
                u32::try_from(v).map(LineNumber::Line).map_err(|_| {
                    E::invalid_value(de::Unexpected::Unsigned(v), &self)
                })
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<LineNumber, E> {
                u32::try_from(v).map(LineNumber::Line).map_err(|_| {
                    E::invalid_value(de::Unexpected::Signed(v), &self)
                })
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<LineNumber, E> {
                if v == UNAVAILABLE {
                    Ok(LineNumber::Unavailable)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }
        }

        d.deserialize_any(LineNumberVisitor)
    }
}

impl fmt::Display for LineNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineNumber::Line(n) => write!(f, "{n}"),
            LineNumber::Unavailable => f.write_str(UNAVAILABLE),
        }
    }
}

/// Where a function is defined.
///
/// The `file` path is relative to the repository root, in the same form the
/// search tool reports match paths, so definition sites and search matches
/// compare equal as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDefinition {
    /// Defining file, relative to the repository root.
    pub file: String,

    /// Line of the definition, when the tag pattern exposed one.
    pub line: LineNumber,

    /// `name(params)` when the tagger reported a signature field, otherwise
    /// the bare name.
    pub signature: String,
}

/// Root artifact merging the three maps under their fixed keys.
///
/// Field names are the artifact's JSON keys; renaming a field is a breaking
/// change for every downstream consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureMap {
    /// Function name → definition site.
    pub code_map: CodeMap,

    /// File → included names in source order.
    pub file_dependencies: DependencyMap,

    /// File → sorted set of referenced function names.
    pub call_map: CallMap,
}

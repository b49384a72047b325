//! DOT source assembly.
//!
//! A small builder for the graph descriptions handed to the layout
//! engine. Emission is deterministic: node statements come out sorted by
//! id, edge statements in insertion order. Every id and attribute value
//! is double-quoted with `"` and `\` escaped, so arbitrary file paths are
//! safe as node ids.

use std::collections::BTreeMap;
use std::fmt;

/// A directed graph under construction.
#[derive(Debug, Default)]
pub(crate) struct DotGraph {
    name: String,
    graph_attrs: Vec<(String, String)>,
    node_defaults: Vec<(String, String)>,
    nodes: BTreeMap<String, Vec<(String, String)>>,
    edges: Vec<(String, String)>,
}

impl DotGraph {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Sets a graph-level attribute, emitted in call order.
    pub(crate) fn graph_attr(&mut self, key: &str, value: &str) {
        self.graph_attrs.push((key.to_string(), value.to_string()));
    }

    /// Sets a default attribute applied to every node.
    pub(crate) fn node_default(&mut self, key: &str, value: &str) {
        self.node_defaults.push((key.to_string(), value.to_string()));
    }

    /// Declares a node with no attributes of its own.
    pub(crate) fn node(&mut self, id: &str) {
        self.nodes.entry(id.to_string()).or_default();
    }

    /// Declares a node with its own attribute list, replacing any earlier
    /// declaration of the same id.
    pub(crate) fn styled_node(&mut self, id: &str, attrs: &[(&str, &str)]) {
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.nodes.insert(id.to_string(), attrs);
    }

    pub(crate) fn edge(&mut self, from: &str, to: &str) {
        self.edges.push((from.to_string(), to.to_string()));
    }

    /// True when the graph declares no nodes and no edges.
    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

impl fmt::Display for DotGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph {} {{", Quoted(&self.name))?;
        for (key, value) in &self.graph_attrs {
            writeln!(f, "  {key}={};", Quoted(value))?;
        }
        if !self.node_defaults.is_empty() {
            writeln!(f, "  node [{}];", AttrList(&self.node_defaults))?;
        }
        for (id, attrs) in &self.nodes {
            if attrs.is_empty() {
                writeln!(f, "  {};", Quoted(id))?;
            } else {
                writeln!(f, "  {} [{}];", Quoted(id), AttrList(attrs))?;
            }
        }
        for (from, to) in &self.edges {
            writeln!(f, "  {} -> {};", Quoted(from), Quoted(to))?;
        }
        writeln!(f, "}}")
    }
}

/// A string in DOT double-quoted form.
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.0.chars() {
            if c == '"' || c == '\\' {
                f.write_str("\\")?;
            }
            write!(f, "{c}")?;
        }
        f.write_str("\"")
    }
}

/// A comma-separated `key="value"` list.
struct AttrList<'a>(&'a [(String, String)]);

impl fmt::Display for AttrList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (key, value)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={}", Quoted(value))?;
        }
        Ok(())
    }
}

//! Read-only graph view consumed by the conversion pass.
//!
//! The conversion pass never owns a graph; it is handed a [`GraphSource`]
//! by reference and only ever iterates it. [`MemoryGraph`] is the bundled
//! in-memory implementation for callers that do not already have a
//! graph store of their own.

pub mod memory;

pub use memory::MemoryGraph;

use rustc_hash::FxHashMap;

/// A typed node or edge attribute.
///
/// Attribute maps are a closed set of primitive kinds, validated against
/// the schema at materialization time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl AttrValue {
    /// Returns the attribute's type name as it appears in schema
    /// documents.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Str(_) => "string",
            AttrValue::Int(_) => "int",
            AttrValue::Bool(_) => "boolean",
        }
    }

    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

/// An entity in the source graph: a globally unique identifier, a type
/// tag naming the schema it maps to, and primitive attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: String,
    type_tag: String,
    attrs: FxHashMap<String, AttrValue>,
}

impl Node {
    /// Creates a node with no attributes.
    pub fn new(id: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_tag: type_tag.into(),
            attrs: FxHashMap::default(),
        }
    }

    /// Adds an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// Looks up an attribute by name.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }
}

/// A directed, attributed edge. Multiple edges of different relationship
/// types may exist between the same pair of nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    source: String,
    target: String,
    relationship: String,
    attrs: FxHashMap<String, AttrValue>,
}

impl Edge {
    /// Creates an edge with no attributes.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relationship: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship: relationship.into(),
            attrs: FxHashMap::default(),
        }
    }

    /// Adds an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn relationship(&self) -> &str {
        &self.relationship
    }

    /// Looks up an edge attribute by name.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }
}

/// Narrow read-only view over a caller-owned graph.
///
/// Every method returns a fresh, finite traversal; there is no shared
/// cursor state between calls. Iteration order is stable within one
/// traversal but carries no guarantee across independent calls, and
/// reference lists built from it must be compared as sets.
pub trait GraphSource {
    /// Iterates all nodes carrying the given type tag.
    fn nodes_of_type<'a>(&'a self, type_tag: &str) -> Box<dyn Iterator<Item = &'a Node> + 'a>;

    /// Iterates the outgoing edges of a node with the given relationship
    /// tag. Unknown node ids yield an empty traversal.
    fn outgoing_edges<'a>(
        &'a self,
        node_id: &str,
        relationship: &str,
    ) -> Box<dyn Iterator<Item = &'a Edge> + 'a>;

    /// Iterates the incoming edges of a node with the given relationship
    /// tag. Unknown node ids yield an empty traversal.
    fn incoming_edges<'a>(
        &'a self,
        node_id: &str,
        relationship: &str,
    ) -> Box<dyn Iterator<Item = &'a Edge> + 'a>;
}

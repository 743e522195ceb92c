//! In-memory property graph.
//!
//! Hash-indexed node storage with per-node adjacency lists. Insertion
//! order is preserved within each adjacency list, so one traversal is
//! stable; no order is promised across graphs or insertions.

use rustc_hash::FxHashMap;

use crate::error::GraphError;
use crate::graph::{Edge, GraphSource, Node};

/// A caller-owned, in-memory graph.
///
/// Mutable while being built, then passed by shared reference into the
/// conversion pass, which only reads it.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    nodes: Vec<Node>,
    node_index: FxHashMap<String, usize>,
    edges: Vec<Edge>,
    /// node id -> indices into `edges`, insertion order
    outgoing: FxHashMap<String, Vec<usize>>,
    incoming: FxHashMap<String, Vec<usize>>,
}

impl MemoryGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node. Fails if a node with the same id already exists.
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.node_index.contains_key(node.id()) {
            return Err(GraphError::DuplicateNode {
                id: node.id().to_string(),
            });
        }
        self.node_index.insert(node.id().to_string(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Adds a directed edge. Both endpoints must already exist.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if !self.node_index.contains_key(edge.source()) {
            return Err(GraphError::UnknownSource {
                id: edge.source().to_string(),
            });
        }
        if !self.node_index.contains_key(edge.target()) {
            return Err(GraphError::UnknownTarget {
                id: edge.target().to_string(),
            });
        }
        let idx = self.edges.len();
        self.outgoing
            .entry(edge.source().to_string())
            .or_default()
            .push(idx);
        self.incoming
            .entry(edge.target().to_string())
            .or_default()
            .push(idx);
        self.edges.push(edge);
        Ok(())
    }

    /// Looks up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl GraphSource for MemoryGraph {
    fn nodes_of_type<'a>(&'a self, type_tag: &str) -> Box<dyn Iterator<Item = &'a Node> + 'a> {
        let type_tag = type_tag.to_string();
        Box::new(
            self.nodes
                .iter()
                .filter(move |n| n.type_tag() == type_tag),
        )
    }

    fn outgoing_edges<'a>(
        &'a self,
        node_id: &str,
        relationship: &str,
    ) -> Box<dyn Iterator<Item = &'a Edge> + 'a> {
        let relationship = relationship.to_string();
        let indices = self.outgoing.get(node_id).map(Vec::as_slice).unwrap_or(&[]);
        Box::new(
            indices
                .iter()
                .map(move |&i| &self.edges[i])
                .filter(move |e| e.relationship() == relationship),
        )
    }

    fn incoming_edges<'a>(
        &'a self,
        node_id: &str,
        relationship: &str,
    ) -> Box<dyn Iterator<Item = &'a Edge> + 'a> {
        let relationship = relationship.to_string();
        let indices = self.incoming.get(node_id).map(Vec::as_slice).unwrap_or(&[]);
        Box::new(
            indices
                .iter()
                .map(move |&i| &self.edges[i])
                .filter(move |e| e.relationship() == relationship),
        )
    }
}

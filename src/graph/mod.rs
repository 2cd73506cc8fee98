//! Citation graph over works identified by DOI.
//!
//! The graph is only ever grown by [`assemble`]: node IDs are handed out once
//! per DOI, in first-encounter order starting at 1, and nodes and edges are
//! never removed. Callers get read-only access.

mod assemble;
mod summary;

pub use assemble::assemble;
pub use summary::GraphSummary;

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::models::WorkRecord;

/// Integer ID of a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Numeric value of the ID
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed edge from the citing work to the cited work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

/// DOI to node ID assignments made during one assembly run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMapping {
    ids: HashMap<String, NodeId>,
    next: u32,
}

impl Default for NodeMapping {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeMapping {
    fn new() -> Self {
        Self {
            ids: HashMap::new(),
            next: 1,
        }
    }

    /// Look up the ID assigned to `doi`
    pub fn get(&self, doi: &str) -> Option<NodeId> {
        self.ids.get(doi).copied()
    }

    /// Whether `doi` has been assigned an ID
    pub fn contains(&self, doi: &str) -> bool {
        self.ids.contains_key(doi)
    }

    /// Number of assigned IDs
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no ID has been assigned yet
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All assignments, ordered by ascending node ID
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        let mut pairs: Vec<(&str, NodeId)> =
            self.ids.iter().map(|(doi, id)| (doi.as_str(), *id)).collect();
        pairs.sort_by_key(|(_, id)| *id);
        pairs.into_iter()
    }

    /// Returns the existing ID for `doi`, or assigns the next one.
    ///
    /// The boolean is `true` when a new ID was assigned.
    fn assign(&mut self, doi: &str) -> (NodeId, bool) {
        if let Some(id) = self.get(doi) {
            return (id, false);
        }

        let id = NodeId(self.next);
        self.next += 1;
        self.ids.insert(doi.to_string(), id);
        (id, true)
    }
}

/// Directed citation graph: a node table plus an ordered edge list.
///
/// Duplicate edges are kept and self-loops are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationGraph {
    nodes: BTreeMap<NodeId, WorkRecord>,
    edges: Vec<Edge>,
}

impl CitationGraph {
    fn add_node(&mut self, id: NodeId, work: WorkRecord) {
        self.nodes.entry(id).or_insert(work);
    }

    fn add_edge(&mut self, source: NodeId, target: NodeId) {
        debug_assert!(self.nodes.contains_key(&source) && self.nodes.contains_key(&target));
        self.edges.push(Edge { source, target });
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges, duplicates included
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Attributes of node `id`
    pub fn node(&self, id: NodeId) -> Option<&WorkRecord> {
        self.nodes.get(&id)
    }

    /// Nodes in ascending ID order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &WorkRecord)> {
        self.nodes.iter().map(|(id, work)| (*id, work))
    }

    /// Edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.iter().copied()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Grows a graph and its mapping together so IDs and node entries stay in step
#[derive(Debug)]
struct GraphBuilder {
    graph: CitationGraph,
    mapping: NodeMapping,
}

impl GraphBuilder {
    fn new() -> Self {
        Self {
            graph: CitationGraph::default(),
            mapping: NodeMapping::new(),
        }
    }

    /// Returns the node for `doi`, creating it with `make_work` on first sight.
    ///
    /// `make_work` only runs for new DOIs, so the first record attached wins.
    fn intern<F>(&mut self, doi: &str, make_work: F) -> NodeId
    where
        F: FnOnce() -> WorkRecord,
    {
        let (id, is_new) = self.mapping.assign(doi);
        if is_new {
            self.graph.add_node(id, make_work());
        }
        id
    }

    fn connect(&mut self, source: NodeId, target: NodeId) {
        self.graph.add_edge(source, target);
    }

    fn finish(self) -> (CitationGraph, NodeMapping) {
        (self.graph, self.mapping)
    }
}

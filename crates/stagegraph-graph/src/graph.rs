use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use stagegraph_core::error::{Result, StageGraphError};

use crate::edge::{Edge, EdgeKind, EdgeRecord};
use crate::node::{Node, NodeId};

/// A node plus the edges incident to it (indices into the arena's edge list).
#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    outgoing: Vec<usize>,
    incoming: Vec<usize>,
    undirected: Vec<usize>,
}

/// The entry/end pair a graph exposes for composition.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
pub struct Boundary {
    pub entry: NodeId,
    pub end: NodeId,
}

/// Nodes of an absorbed subgraph, kept for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub alias: String,
    pub title: String,
    pub members: Vec<NodeId>,
}

/// Owning storage for nodes and edges.
///
/// Edges refer to slot positions. Absorbing another arena appends its slots
/// and shifts its edge positions by the current slot count.
#[derive(Debug, Clone, Default)]
struct Arena {
    slots: Vec<Slot>,
    positions: HashMap<NodeId, usize>,
    edges: Vec<EdgeRecord>,
    edge_keys: HashSet<EdgeRecord>,
    clusters: Vec<Cluster>,
}

impl Arena {
    fn insert(&mut self, node: Node) -> Result<NodeId> {
        if self.positions.contains_key(&node.id()) {
            return Err(StageGraphError::DuplicateNode(node.id().to_string()));
        }
        Ok(self.push_node(node))
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.positions.insert(id, self.slots.len());
        self.slots.push(Slot {
            node,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            undirected: Vec::new(),
        });
        id
    }

    fn position(&self, id: NodeId) -> Result<usize> {
        self.positions
            .get(&id)
            .copied()
            .ok_or_else(|| StageGraphError::UnknownNode(id.to_string()))
    }

    fn link(&mut self, kind: EdgeKind, from: NodeId, to: NodeId) -> Result<bool> {
        let from_pos = self.position(from)?;
        let to_pos = self.position(to)?;
        if kind.is_directed() && from_pos == to_pos {
            return Err(StageGraphError::SelfLoop(from.to_string()));
        }

        let record = EdgeRecord::new(kind, from_pos, to_pos);
        if !self.edge_keys.insert(record.key()) {
            debug!(?kind, %from, %to, "Edge already registered");
            return Ok(false);
        }
        self.push_edge(record);
        debug!(?kind, %from, %to, "Linked nodes");
        Ok(true)
    }

    fn push_edge(&mut self, record: EdgeRecord) {
        let index = self.edges.len();
        self.edges.push(record);
        if record.kind.is_directed() {
            self.slots[record.from].outgoing.push(index);
            self.slots[record.to].incoming.push(index);
        } else {
            self.slots[record.from].undirected.push(index);
            self.slots[record.to].undirected.push(index);
        }
    }

    /// Move every node and edge of `other` into this arena.
    fn absorb(&mut self, other: Arena) -> Result<()> {
        if let Some(dup) = other
            .positions
            .keys()
            .find(|id| self.positions.contains_key(id))
        {
            return Err(StageGraphError::DuplicateNode(dup.to_string()));
        }

        let offset = self.slots.len();
        for slot in other.slots {
            self.push_node(slot.node);
        }
        for record in other.edges {
            let shifted = record.shifted(offset);
            self.edge_keys.insert(shifted.key());
            self.push_edge(shifted);
        }
        self.clusters.extend(other.clusters);
        Ok(())
    }

    fn edge(&self, index: usize) -> Edge {
        let record = self.edges[index];
        Edge {
            kind: record.kind,
            from: self.slots[record.from].node.id(),
            to: self.slots[record.to].node.id(),
        }
    }

    fn clustered(&self) -> HashSet<NodeId> {
        self.clusters
            .iter()
            .flat_map(|c| c.members.iter().copied())
            .collect()
    }
}

/// Mutable arena used to assemble a [`Graph`].
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    name: String,
    arena: Arena,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arena: Arena::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn create_start(&mut self) -> NodeId {
        self.arena.push_node(Node::start())
    }

    pub fn create_end(&mut self) -> NodeId {
        self.arena.push_node(Node::end())
    }

    pub fn create_task(&mut self, label: impl Into<String>, payload: impl Into<Value>) -> NodeId {
        self.arena.push_node(Node::task(label, payload))
    }

    /// Insert an existing node, rejecting an identity already in the arena.
    pub fn insert(&mut self, node: Node) -> Result<NodeId> {
        self.arena.insert(node)
    }

    /// Register an AND-join edge. Returns `false` if it already existed.
    pub fn link_hard(&mut self, from: NodeId, to: NodeId) -> Result<bool> {
        self.arena.link(EdgeKind::DirectedHard, from, to)
    }

    /// Register an OR-join edge. Returns `false` if it already existed.
    pub fn link_soft(&mut self, from: NodeId, to: NodeId) -> Result<bool> {
        self.arena.link(EdgeKind::DirectedSoft, from, to)
    }

    /// Register a symmetric association. Argument order does not matter.
    pub fn link_undirected(&mut self, a: NodeId, b: NodeId) -> Result<bool> {
        self.arena.link(EdgeKind::Undirected, a, b)
    }

    /// Consume `graph`, moving its nodes and edges into this arena.
    ///
    /// Nodes that were not already part of a cluster are grouped under
    /// `alias`, titled with the absorbed graph's name.
    pub fn absorb(&mut self, alias: impl Into<String>, graph: Graph) -> Result<Boundary> {
        let Graph {
            name,
            arena,
            entry,
            end,
        } = graph;

        let already = arena.clustered();
        let members: Vec<NodeId> = arena
            .slots
            .iter()
            .map(|s| s.node.id())
            .filter(|id| !already.contains(id))
            .collect();

        self.arena.absorb(arena)?;
        if !members.is_empty() {
            self.arena.clusters.push(Cluster {
                alias: alias.into(),
                title: name,
                members,
            });
        }
        Ok(Boundary { entry, end })
    }

    /// Seal the arena into a graph with the given boundary nodes.
    pub fn finish(self, entry: NodeId, end: NodeId) -> Result<Graph> {
        let graph = Graph {
            name: self.name,
            arena: self.arena,
            entry,
            end,
        };
        graph.check_boundaries()?;
        debug!(
            graph = %graph.name,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Graph finalized"
        );
        Ok(graph)
    }
}

/// A finalized graph: an arena plus its entry and end nodes.
#[derive(Debug, Clone)]
pub struct Graph {
    name: String,
    arena: Arena,
    entry: NodeId,
    end: NodeId,
}

impl Graph {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> NodeId {
        self.entry
    }

    pub fn end(&self) -> NodeId {
        self.end
    }

    pub fn boundary(&self) -> Boundary {
        Boundary {
            entry: self.entry,
            end: self.end,
        }
    }

    pub fn node_count(&self) -> usize {
        self.arena.slots.len()
    }

    pub fn edge_count(&self) -> usize {
        self.arena.edges.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.positions.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        let pos = *self.arena.positions.get(&id)?;
        Some(&self.arena.slots[pos].node)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.arena.slots.iter().map(|s| &s.node)
    }

    /// Edges in registration order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        (0..self.arena.edges.len()).map(|i| self.arena.edge(i))
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.arena.clusters
    }

    /// First node carrying `label`, in insertion order.
    pub fn find_label(&self, label: &str) -> Option<NodeId> {
        self.nodes().find(|n| n.label() == label).map(|n| n.id())
    }

    /// Directed edges pointing at `id`.
    pub fn incoming(&self, id: NodeId) -> Vec<Edge> {
        self.slot_edges(id, |s| &s.incoming)
    }

    /// Directed edges leaving `id`.
    pub fn outgoing(&self, id: NodeId) -> Vec<Edge> {
        self.slot_edges(id, |s| &s.outgoing)
    }

    /// Every edge touching `id`, undirected ones included.
    pub fn incident(&self, id: NodeId) -> Vec<Edge> {
        let mut edges = self.incoming(id);
        edges.extend(self.outgoing(id));
        edges.extend(self.slot_edges(id, |s| &s.undirected));
        edges
    }

    /// Sources of the incoming edges of the given kind.
    pub fn predecessors(&self, id: NodeId, kind: EdgeKind) -> Vec<NodeId> {
        self.incoming(id)
            .into_iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.from)
            .collect()
    }

    /// Targets of all outgoing directed edges, without repeats.
    pub fn successors(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.outgoing(id)
            .into_iter()
            .map(|e| e.to)
            .filter(|to| seen.insert(*to))
            .collect()
    }

    fn slot_edges(&self, id: NodeId, pick: impl Fn(&Slot) -> &Vec<usize>) -> Vec<Edge> {
        match self.arena.positions.get(&id) {
            Some(&pos) => pick(&self.arena.slots[pos])
                .iter()
                .map(|&i| self.arena.edge(i))
                .collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn positions(&self) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        self.arena
            .slots
            .iter()
            .enumerate()
            .map(|(pos, s)| (pos, s.node.id()))
    }

    pub(crate) fn raw_edges(&self) -> &[EdgeRecord] {
        &self.arena.edges
    }

    pub(crate) fn position_of(&self, id: NodeId) -> Option<usize> {
        self.arena.positions.get(&id).copied()
    }

    /// Entry must be a start node without incoming directed edges; end must
    /// be an end node without outgoing directed edges.
    pub(crate) fn check_boundaries(&self) -> Result<()> {
        let entry = self
            .node(self.entry)
            .ok_or_else(|| boundary(self.entry, "entry is not in the graph"))?;
        if !entry.is_start() {
            return Err(boundary(self.entry, "entry is not a start node"));
        }
        if !self.incoming(self.entry).is_empty() {
            return Err(boundary(self.entry, "entry has incoming directed edges"));
        }

        let end = self
            .node(self.end)
            .ok_or_else(|| boundary(self.end, "end is not in the graph"))?;
        if !end.is_end() {
            return Err(boundary(self.end, "end is not an end node"));
        }
        if !self.outgoing(self.end).is_empty() {
            return Err(boundary(self.end, "end has outgoing directed edges"));
        }
        Ok(())
    }
}

fn boundary(node: NodeId, reason: &str) -> StageGraphError {
    StageGraphError::BoundaryViolation {
        node: node.to_string(),
        reason: reason.to_string(),
    }
}

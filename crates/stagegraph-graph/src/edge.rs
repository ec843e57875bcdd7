use serde::{Deserialize, Serialize};

use crate::node::NodeId;

/// How an edge constrains its target.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// AND-join: the target waits for every hard predecessor.
    DirectedHard,
    /// OR-join: the target waits for at least one soft predecessor.
    DirectedSoft,
    /// Non-blocking association, no ordering.
    Undirected,
}

impl EdgeKind {
    pub fn is_directed(self) -> bool {
        !matches!(self, EdgeKind::Undirected)
    }
}

/// An edge between two nodes of the same graph.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
pub struct Edge {
    pub kind: EdgeKind,
    pub from: NodeId,
    pub to: NodeId,
}

impl Edge {
    /// The endpoint opposite to `node`.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if self.from == node {
            Some(self.to)
        } else if self.to == node {
            Some(self.from)
        } else {
            None
        }
    }
}

/// Arena-local edge: endpoints are slot positions, not node references.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub(crate) struct EdgeRecord {
    pub kind: EdgeKind,
    pub from: usize,
    pub to: usize,
}

impl EdgeRecord {
    pub fn new(kind: EdgeKind, from: usize, to: usize) -> Self {
        Self { kind, from, to }
    }

    /// Identity used for idempotent registration. Undirected pairs ignore order.
    pub fn key(&self) -> EdgeRecord {
        match self.kind {
            EdgeKind::Undirected if self.from > self.to => Self::new(self.kind, self.to, self.from),
            _ => *self,
        }
    }

    pub fn shifted(&self, offset: usize) -> EdgeRecord {
        Self::new(self.kind, self.from + offset, self.to + offset)
    }
}

//! Readiness evaluation for an execution engine.
//!
//! A node is ready when every hard predecessor has completed and, if it has
//! soft predecessors, at least one of them has completed. Undirected edges
//! take no part.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use stagegraph_core::error::{Result, StageGraphError};

use crate::edge::EdgeKind;
use crate::graph::Graph;
use crate::node::NodeId;

impl Graph {
    /// Evaluate the readiness predicate of `id` against a completion set.
    pub fn readiness_satisfied(&self, id: NodeId, completed: &HashSet<NodeId>) -> bool {
        let mut has_soft = false;
        let mut any_soft_done = false;
        for edge in self.incoming(id) {
            let done = completed.contains(&edge.from);
            match edge.kind {
                EdgeKind::DirectedHard if !done => return false,
                EdgeKind::DirectedSoft => {
                    has_soft = true;
                    any_soft_done |= done;
                }
                _ => {}
            }
        }
        !has_soft || any_soft_done
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Waiting,
    Ready,
    Completed,
}

/// Per-node `Waiting -> Ready -> Completed` state over a finished graph.
///
/// Each node enters `Ready` at most once, no matter how many of its
/// predecessors complete afterwards.
pub struct ReadinessTracker<'g> {
    graph: &'g Graph,
    states: HashMap<NodeId, NodeState>,
    completed: HashSet<NodeId>,
}

impl<'g> ReadinessTracker<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        let completed = HashSet::new();
        let states = graph
            .nodes()
            .map(|n| {
                let state = if graph.readiness_satisfied(n.id(), &completed) {
                    NodeState::Ready
                } else {
                    NodeState::Waiting
                };
                (n.id(), state)
            })
            .collect();
        Self {
            graph,
            states,
            completed,
        }
    }

    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.states.get(&id).copied()
    }

    pub fn is_ready(&self, id: NodeId) -> bool {
        self.state(id) == Some(NodeState::Ready)
    }

    pub fn is_completed(&self, id: NodeId) -> bool {
        self.completed.contains(&id)
    }

    /// True once the graph's end node has completed.
    pub fn is_finished(&self) -> bool {
        self.is_completed(self.graph.end())
    }

    /// Nodes currently ready and not yet completed, in graph order.
    pub fn ready_nodes(&self) -> Vec<NodeId> {
        self.graph
            .nodes()
            .map(|n| n.id())
            .filter(|id| self.is_ready(*id))
            .collect()
    }

    /// Record that `id` completed; returns the nodes that became ready as a result.
    ///
    /// Completing a node twice is a no-op. Completing a node that is still
    /// waiting is an engine bug and reported as [`StageGraphError::NotReady`].
    pub fn complete(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        match self.state(id) {
            None => return Err(StageGraphError::UnknownNode(id.to_string())),
            Some(NodeState::Completed) => return Ok(Vec::new()),
            Some(NodeState::Waiting) => return Err(StageGraphError::NotReady(id.to_string())),
            Some(NodeState::Ready) => {}
        }

        self.states.insert(id, NodeState::Completed);
        self.completed.insert(id);

        let mut newly_ready = Vec::new();
        for next in self.graph.successors(id) {
            if self.state(next) != Some(NodeState::Waiting) {
                continue;
            }
            if self.graph.readiness_satisfied(next, &self.completed) {
                self.states.insert(next, NodeState::Ready);
                newly_ready.push(next);
            }
        }
        debug!(node = %id, newly_ready = newly_ready.len(), "Node completed");
        Ok(newly_ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    /// `start` fans out (hard) to `a` and `b`; `a` and `b` feed `target`.
    fn two_into_one(kind_a: EdgeKind, kind_b: EdgeKind) -> (Graph, [NodeId; 4]) {
        let mut b = GraphBuilder::new("Join");
        let start = b.create_start();
        let pa = b.create_task("a", 1);
        let pb = b.create_task("b", 2);
        let target = b.create_end();
        b.link_hard(start, pa).unwrap();
        b.link_hard(start, pb).unwrap();
        for (pred, kind) in [(pa, kind_a), (pb, kind_b)] {
            match kind {
                EdgeKind::DirectedHard => b.link_hard(pred, target).unwrap(),
                EdgeKind::DirectedSoft => b.link_soft(pred, target).unwrap(),
                EdgeKind::Undirected => b.link_undirected(pred, target).unwrap(),
            };
        }
        let g = b.finish(start, target).unwrap();
        (g, [start, pa, pb, target])
    }

    #[test]
    fn test_hard_join_waits_for_all_in_any_order() {
        let (g, [start, a, b, target]) =
            two_into_one(EdgeKind::DirectedHard, EdgeKind::DirectedHard);
        for order in [[a, b], [b, a]] {
            let mut t = ReadinessTracker::new(&g);
            assert_eq!(t.ready_nodes(), vec![start]);
            t.complete(start).unwrap();
            assert!(t.complete(order[0]).unwrap().is_empty());
            assert!(!t.is_ready(target));
            assert_eq!(t.complete(order[1]).unwrap(), vec![target]);
            assert!(t.is_ready(target));
        }
    }

    #[test]
    fn test_soft_join_ready_on_first() {
        let (g, [start, a, b, target]) =
            two_into_one(EdgeKind::DirectedSoft, EdgeKind::DirectedSoft);
        for order in [[a, b], [b, a]] {
            let mut t = ReadinessTracker::new(&g);
            t.complete(start).unwrap();
            assert_eq!(t.complete(order[0]).unwrap(), vec![target]);
            assert!(t.is_ready(target));
            // The second completion does not re-trigger the target.
            assert!(t.complete(order[1]).unwrap().is_empty());
            assert_eq!(t.state(target), Some(NodeState::Ready));
        }
    }

    #[test]
    fn test_mixed_gate_needs_hard_and_one_soft() {
        let (g, [start, hard, soft, target]) =
            two_into_one(EdgeKind::DirectedHard, EdgeKind::DirectedSoft);

        let mut t = ReadinessTracker::new(&g);
        t.complete(start).unwrap();
        assert!(t.complete(soft).unwrap().is_empty());
        assert!(!t.is_ready(target));
        assert_eq!(t.complete(hard).unwrap(), vec![target]);

        let mut t = ReadinessTracker::new(&g);
        t.complete(start).unwrap();
        assert!(t.complete(hard).unwrap().is_empty());
        assert!(!t.is_ready(target));
        assert_eq!(t.complete(soft).unwrap(), vec![target]);
    }

    #[test]
    fn test_undirected_edges_do_not_block() {
        let (g, [start, hard, assoc, target]) =
            two_into_one(EdgeKind::DirectedHard, EdgeKind::Undirected);
        let mut t = ReadinessTracker::new(&g);
        t.complete(start).unwrap();
        assert_eq!(t.complete(hard).unwrap(), vec![target]);
        assert!(!t.is_completed(assoc));
    }

    #[test]
    fn test_predicate_matches_tracker() {
        let (g, [start, a, b, target]) =
            two_into_one(EdgeKind::DirectedHard, EdgeKind::DirectedSoft);
        let done: HashSet<NodeId> = [start, a].into_iter().collect();
        assert!(!g.readiness_satisfied(target, &done));
        let done: HashSet<NodeId> = [start, a, b].into_iter().collect();
        assert!(g.readiness_satisfied(target, &done));
        assert!(g.readiness_satisfied(start, &HashSet::new()));
    }

    #[test]
    fn test_complete_errors_and_idempotence() {
        let (g, [start, a, _, target]) =
            two_into_one(EdgeKind::DirectedHard, EdgeKind::DirectedHard);
        let mut t = ReadinessTracker::new(&g);
        assert!(matches!(t.complete(a), Err(StageGraphError::NotReady(_))));

        t.complete(start).unwrap();
        assert!(t.complete(start).unwrap().is_empty());
        assert!(t.is_completed(start));

        let foreign = GraphBuilder::new("Other").create_start();
        assert!(matches!(
            t.complete(foreign),
            Err(StageGraphError::UnknownNode(_))
        ));
        assert!(!t.is_finished());
        assert_eq!(t.state(target), Some(NodeState::Waiting));
    }
}

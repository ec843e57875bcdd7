use petgraph::algo::{has_path_connecting, is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex, UnGraph};

use stagegraph_core::error::{Result, StageGraphError};

use crate::edge::EdgeKind;
use crate::graph::Graph;
use crate::node::NodeId;

impl Graph {
    /// Check the structural invariants of a finished graph.
    ///
    /// 1. every slot is the one its id indexes, so no identity is held twice
    /// 2. directed edges form no cycle
    /// 3. entry and end satisfy the boundary rules
    /// 4. end is reachable from entry, counting undirected edges both ways
    pub fn validate(&self) -> Result<()> {
        for (pos, id) in self.positions() {
            if self.position_of(id) != Some(pos) {
                return Err(StageGraphError::DuplicateNode(id.to_string()));
            }
        }

        if is_cyclic_directed(&self.directed_view()) {
            return Err(StageGraphError::CycleDetected(self.name().to_string()));
        }

        self.check_boundaries()?;

        if !self.is_linked(self.entry(), self.end()) {
            return Err(StageGraphError::Disconnected {
                graph: self.name().to_string(),
                entry: self.entry().to_string(),
                end: self.end().to_string(),
            });
        }
        Ok(())
    }

    /// Whether `to` can be reached from `from` along directed edges only.
    pub fn has_directed_path(&self, from: NodeId, to: NodeId) -> bool {
        match (self.position_of(from), self.position_of(to)) {
            (Some(a), Some(b)) => has_path_connecting(
                &self.directed_view(),
                NodeIndex::new(a),
                NodeIndex::new(b),
                None,
            ),
            _ => false,
        }
    }

    /// Whether `a` and `b` are connected through any mix of edges.
    pub fn is_linked(&self, a: NodeId, b: NodeId) -> bool {
        match (self.position_of(a), self.position_of(b)) {
            (Some(a), Some(b)) => has_path_connecting(
                &self.undirected_view(),
                NodeIndex::new(a),
                NodeIndex::new(b),
                None,
            ),
            _ => false,
        }
    }

    /// A topological order over directed edges, `None` if a cycle exists.
    pub fn topological_order(&self) -> Option<Vec<NodeId>> {
        let view = self.directed_view();
        let sorted = toposort(&view, None).ok()?;
        Some(sorted.into_iter().map(|idx| view[idx]).collect())
    }

    /// Directed edges only; node index `i` is arena position `i`.
    fn directed_view(&self) -> DiGraph<NodeId, EdgeKind> {
        let mut view = DiGraph::with_capacity(self.node_count(), self.edge_count());
        for (_, id) in self.positions() {
            view.add_node(id);
        }
        for record in self.raw_edges().iter().filter(|r| r.kind.is_directed()) {
            view.add_edge(NodeIndex::new(record.from), NodeIndex::new(record.to), record.kind);
        }
        view
    }

    /// Every edge, direction ignored.
    fn undirected_view(&self) -> UnGraph<NodeId, EdgeKind> {
        let mut view = UnGraph::with_capacity(self.node_count(), self.edge_count());
        for (_, id) in self.positions() {
            view.add_node(id);
        }
        for record in self.raw_edges() {
            view.add_edge(NodeIndex::new(record.from), NodeIndex::new(record.to), record.kind);
        }
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    #[test]
    fn test_valid_chain() {
        let mut b = GraphBuilder::new("Chain");
        let start = b.create_start();
        let t = b.create_task("t", 0);
        let end = b.create_end();
        b.link_hard(start, t).unwrap();
        b.link_soft(t, end).unwrap();
        let g = b.finish(start, end).unwrap();

        assert!(g.validate().is_ok());
        assert!(g.has_directed_path(start, end));
        assert!(!g.has_directed_path(end, start));
        assert_eq!(g.topological_order(), Some(vec![start, t, end]));
    }

    #[test]
    fn test_detect_cycle() {
        let mut b = GraphBuilder::new("Cyclic");
        let start = b.create_start();
        let x = b.create_task("x", 0);
        let y = b.create_task("y", 0);
        let end = b.create_end();
        b.link_hard(start, x).unwrap();
        b.link_hard(x, y).unwrap();
        b.link_soft(y, x).unwrap();
        b.link_hard(y, end).unwrap();
        let g = b.finish(start, end).unwrap();

        assert!(matches!(g.validate(), Err(StageGraphError::CycleDetected(_))));
        assert!(g.topological_order().is_none());
    }

    #[test]
    fn test_detect_disconnected() {
        let mut b = GraphBuilder::new("Split");
        let start = b.create_start();
        let end = b.create_end();
        let g = b.finish(start, end).unwrap();
        assert!(matches!(
            g.validate(),
            Err(StageGraphError::Disconnected { .. })
        ));
    }

    #[test]
    fn test_undirected_link_counts_as_connection() {
        let mut b = GraphBuilder::new("Assoc");
        let start = b.create_start();
        let end = b.create_end();
        b.link_undirected(end, start).unwrap();
        let g = b.finish(start, end).unwrap();

        assert!(g.validate().is_ok());
        assert!(g.is_linked(start, end));
        assert!(!g.has_directed_path(start, end));
    }
}

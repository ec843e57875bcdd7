//! Stitching finished graphs into one.
//!
//! A [`Composer`] absorbs graphs into a single arena and links their
//! boundary nodes. Edges added here are ordinary edges; readiness does not
//! distinguish them from edges placed by the subgraph builders.

use tracing::{debug, info};

use stagegraph_core::error::Result;

use crate::graph::{Boundary, Graph, GraphBuilder};
use crate::node::NodeId;

pub struct Composer {
    builder: GraphBuilder,
}

impl Composer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            builder: GraphBuilder::new(name),
        }
    }

    /// Absorb `graph` under `alias` and return its boundary.
    pub fn add(&mut self, alias: impl Into<String>, graph: Graph) -> Result<Boundary> {
        let alias = alias.into();
        debug!(
            into = %self.builder.name(),
            alias = %alias,
            graph = %graph.name(),
            nodes = graph.node_count(),
            "Absorbing subgraph"
        );
        self.builder.absorb(alias, graph)
    }

    /// Associate one producer's end with several sibling entries, without ordering.
    pub fn fan_in(&mut self, producer_end: NodeId, sibling_entries: &[NodeId]) -> Result<()> {
        for &entry in sibling_entries {
            self.builder.link_undirected(producer_end, entry)?;
        }
        Ok(())
    }

    /// `downstream_entry` waits for `hard_from` and for `soft_from` (or any
    /// other soft predecessor it already has).
    pub fn gate(
        &mut self,
        downstream_entry: NodeId,
        hard_from: NodeId,
        soft_from: NodeId,
    ) -> Result<()> {
        self.builder.link_soft(soft_from, downstream_entry)?;
        self.builder.link_hard(hard_from, downstream_entry)?;
        Ok(())
    }

    /// `downstream` may start only after `upstream` fully completes.
    pub fn sequence(&mut self, upstream: Boundary, downstream: Boundary) -> Result<()> {
        self.builder.link_hard(upstream.end, downstream.entry)?;
        Ok(())
    }

    /// Direct access for links that are not one of the composition shapes.
    pub fn builder_mut(&mut self) -> &mut GraphBuilder {
        &mut self.builder
    }

    pub fn finish(self, entry: NodeId, end: NodeId) -> Result<Graph> {
        let graph = self.builder.finish(entry, end)?;
        info!(
            graph = %graph.name(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            subgraphs = graph.clusters().len(),
            "Composed graph"
        );
        Ok(graph)
    }
}

/// Compose two graphs so that `second` starts only after `first` completes.
pub fn sequence(first: Graph, second: Graph) -> Result<Graph> {
    let name = format!("{}+{}", first.name(), second.name());
    let first_alias = first.name().to_string();
    let second_alias = second.name().to_string();

    let mut composer = Composer::new(name);
    let a = composer.add(first_alias, first)?;
    let b = composer.add(second_alias, second)?;
    composer.sequence(a, b)?;
    composer.finish(a.entry, b.end)
}

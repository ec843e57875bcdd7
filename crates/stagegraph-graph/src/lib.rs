//! Task graphs with typed edges.
//!
//! Nodes live in an arena owned by a [`GraphBuilder`] and, once finished, by
//! a [`Graph`]. Edges come in three kinds: hard (AND-join), soft (OR-join)
//! and undirected (association only). Graphs compose by absorbing each
//! other's arenas through a [`Composer`].

pub mod compose;
pub mod edge;
pub mod graph;
pub mod node;
pub mod readiness;
pub mod render;
pub mod validate;

pub use compose::{sequence, Composer};
pub use edge::{Edge, EdgeKind};
pub use graph::{Boundary, Cluster, Graph, GraphBuilder};
pub use node::{Node, NodeId, NodeRole};
pub use readiness::{NodeState, ReadinessTracker};
pub use render::{to_json, to_plantuml, RenderOptions};

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::Value;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique node identity.
///
/// Ids are handed out from a monotonically increasing counter and never
/// reused, so a node keeps its identity when its graph is absorbed into
/// another one.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// What a node stands for in the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum NodeRole {
    Start,
    /// A unit of work; the payload is opaque to the graph layer.
    Task { payload: Value },
    End,
}

/// A vertex in a task graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    id: NodeId,
    label: String,
    #[serde(flatten)]
    role: NodeRole,
}

impl Node {
    pub fn start() -> Self {
        Self::with_role("start", NodeRole::Start)
    }

    pub fn end() -> Self {
        Self::with_role("end", NodeRole::End)
    }

    pub fn task(label: impl Into<String>, payload: impl Into<Value>) -> Self {
        Self::with_role(
            label,
            NodeRole::Task {
                payload: payload.into(),
            },
        )
    }

    fn with_role(label: impl Into<String>, role: NodeRole) -> Self {
        Self {
            id: NodeId::next(),
            label: label.into(),
            role,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Task payload, `None` for start and end nodes.
    pub fn payload(&self) -> Option<&Value> {
        match &self.role {
            NodeRole::Task { payload } => Some(payload),
            _ => None,
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self.role, NodeRole::Start)
    }

    pub fn is_end(&self) -> bool {
        matches!(self.role, NodeRole::End)
    }

    pub fn is_task(&self) -> bool {
        matches!(self.role, NodeRole::Task { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_factories_never_repeat_ids() {
        let ids: HashSet<NodeId> = (0..100)
            .flat_map(|i| [Node::start().id(), Node::task("t", i).id(), Node::end().id()])
            .collect();
        assert_eq!(ids.len(), 300);
    }

    #[test]
    fn test_ids_increase_monotonically() {
        let a = Node::start().id();
        let b = Node::end().id();
        assert!(b > a);
    }

    #[test]
    fn test_roles_and_payload() {
        let start = Node::start();
        assert!(start.is_start());
        assert_eq!(start.label(), "start");
        assert!(start.payload().is_none());

        let task = Node::task("task1", 42);
        assert!(task.is_task());
        assert_eq!(task.payload(), Some(&serde_json::json!(42)));

        assert!(Node::end().is_end());
    }

    #[test]
    fn test_serialization_shape() {
        let task = Node::task("task3", "archive");
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["label"], "task3");
        assert_eq!(json["role"], "task");
        assert_eq!(json["payload"], "archive");
        assert_eq!(json["id"], task.id().as_u64());
    }
}

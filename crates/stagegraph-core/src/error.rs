use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageGraphError {
    // Construction errors
    #[error("Node not found in graph: {0}")]
    UnknownNode(String),

    #[error("Directed edge would loop on node {0}")]
    SelfLoop(String),

    #[error("Duplicate node identity in graph: {0}")]
    DuplicateNode(String),

    // Structural defects
    #[error("Directed cycle detected in graph '{0}'")]
    CycleDetected(String),

    #[error("Boundary violation on {node}: {reason}")]
    BoundaryViolation { node: String, reason: String },

    #[error("Graph '{graph}' is disconnected: end {end} unreachable from entry {entry}")]
    Disconnected {
        graph: String,
        entry: String,
        end: String,
    },

    // Readiness errors
    #[error("Node {0} completed before it was ready")]
    NotReady(String),

    // Config errors
    #[error("Missing task argument: {0}")]
    MissingTaskArg(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StageGraphError>;

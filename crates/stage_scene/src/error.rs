//! Error types for the scene model

use thiserror::Error;

use crate::graph::NodeId;

/// Scene graph and document errors
#[derive(Debug, Error)]
pub enum SceneError {
    /// Node not found in the graph
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Reparenting would create a cycle
    #[error("Reparenting node {node} under {parent} would create a cycle")]
    Cycle { node: NodeId, parent: NodeId },

    /// Document declares the same node id twice
    #[error("Duplicate node id in document: {0}")]
    DuplicateNode(NodeId),

    /// Behavior type is not registered
    #[error("Unknown behavior type: {0}")]
    UnknownBehavior(String),

    /// Registered behavior did not match the stored type
    #[error("Behavior type mismatch for: {0}")]
    BehaviorTypeMismatch(String),

    /// Scene document failed to (de)serialize
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Scene file could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised by a user assembly hook.
///
/// Hooks carry a plain message; the pipeline attributes it to the marker
/// and stage it came from.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Result type for scene operations
pub type Result<T> = std::result::Result<T, SceneError>;

/// Result type for assembly hooks
pub type HookResult = std::result::Result<(), HookError>;

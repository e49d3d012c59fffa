// SPDX-License-Identifier: MIT

//! Typed error handling for lattice-rs
//!
//! Build-time graph problems (`GraphError`) are kept separate from run-time
//! failures so callers can tell a graph that never compiled apart from a
//! traversal that aborted. All run-time failures leave the last committed
//! snapshot intact in the checkpoint store.

use thiserror::Error;

use crate::state::StateSnapshot;

/// Top-level error type for lattice-rs
#[derive(Debug, Error)]
pub enum LatticeError {
    /// Graph construction or compilation failed
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// A router produced a key (or raw node name) with no matching target
    #[error("No route for key '{key}' from node '{node}'")]
    Routing { node: String, key: String },

    /// A node raised during invocation; carries the last committed snapshot
    #[error("Node '{node}' failed: {message}")]
    NodeExecution {
        node: String,
        message: String,
        snapshot: Box<StateSnapshot>,
    },

    /// A reducer rejected a partial update; the step was not committed
    #[error(transparent)]
    Reducer(#[from] ReducerError),

    /// `resume` was called on a session with no stored suspension
    #[error("Session '{0}' has no pending suspension")]
    NoPendingSuspension(String),

    /// `resume` was called on a session the store has never seen
    #[error("No checkpoint found for session '{0}'")]
    CheckpointNotFound(String),

    /// Checkpoint store I/O failure, propagated without retry
    #[error("Checkpoint store error: {0}")]
    Store(String),

    /// Traversal exceeded the configured step limit
    #[error("Max steps reached: {0}")]
    MaxSteps(u32),

    /// Scheduled nodes are mutually waiting on static join edges
    #[error("Traversal stalled: scheduled nodes {0:?} wait on uncompleted predecessors")]
    Stalled(Vec<String>),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML schema parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Build-time graph definition errors. Fatal: the graph is never compiled.
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    /// Node name registered twice
    #[error("Duplicate node name: '{0}'")]
    DuplicateNode(String),

    /// An edge, route map, or entry references a node that was never added
    #[error("Unknown node '{node}' referenced by {referenced_by}")]
    UnknownNode { node: String, referenced_by: String },

    /// `set_entry` was never called
    #[error("Graph has no entry point")]
    MissingEntry,

    /// Graph contains no nodes
    #[error("Graph has no nodes")]
    Empty,
}

/// A reducer failed while applying a partial update to one field.
///
/// The whole step aborts: no field from that update is committed.
#[derive(Debug, Error, PartialEq)]
pub enum ReducerError {
    /// Current or incoming value has a shape the reducer cannot combine
    #[error("Field '{field}': {reducer} reducer expected {expected}")]
    TypeMismatch {
        field: String,
        reducer: &'static str,
        expected: &'static str,
    },

    /// A custom reducer returned an error
    #[error("Field '{field}': {message}")]
    Custom { field: String, message: String },
}

impl LatticeError {
    /// Wrap a node failure together with the snapshot that was current
    /// when the node was invoked.
    pub fn node_execution(
        node: impl Into<String>,
        message: impl Into<String>,
        snapshot: StateSnapshot,
    ) -> Self {
        Self::NodeExecution {
            node: node.into(),
            message: message.into(),
            snapshot: Box::new(snapshot),
        }
    }

    /// Create a routing error
    pub fn routing(node: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Routing {
            node: node.into(),
            key: key.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::DuplicateNode("analyze".to_string());
        assert_eq!(err.to_string(), "Duplicate node name: 'analyze'");

        let err = LatticeError::routing("approval", "escalate");
        assert_eq!(
            err.to_string(),
            "No route for key 'escalate' from node 'approval'"
        );

        let err = LatticeError::NoPendingSuspension("session-1".to_string());
        assert!(err.to_string().contains("session-1"));
    }

    #[test]
    fn test_node_execution_carries_snapshot() {
        let snapshot = StateSnapshot::default();
        let err = LatticeError::node_execution("worker", "boom", snapshot.clone());
        match err {
            LatticeError::NodeExecution { node, snapshot: s, .. } => {
                assert_eq!(node, "worker");
                assert_eq!(*s, snapshot);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_graph_error_converts() {
        let err: LatticeError = GraphError::MissingEntry.into();
        assert!(matches!(err, LatticeError::Graph(GraphError::MissingEntry)));
    }
}

// SPDX-License-Identifier: MIT

//! Checkpoints: persisted session records enabling suspend/resume
//!
//! A checkpoint captures everything the engine needs to continue a
//! traversal in a later call, possibly in another process: the committed
//! snapshot, the scheduling queue, and the pending suspension if any.
//! Stores are pluggable; [`InMemorySaver`] is the reference implementation.
//! Expiry and retention are the external store's concern.

mod memory;

pub use memory::InMemorySaver;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;

use crate::state::StateSnapshot;

/// A pending suspension: which node paused and the payload it surfaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suspension {
    /// Node to re-invoke on resume
    pub node: String,
    /// Payload handed back to the caller when the suspension occurred
    pub payload: serde_json::Value,
}

/// Persisted record of one session's execution progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Caller-supplied, opaque session identifier
    pub session_id: String,
    /// Last committed state
    pub snapshot: StateSnapshot,
    /// Nodes scheduled but not yet run, in order
    pub queue: Vec<String>,
    /// Nodes completed in this traversal
    pub completed: HashSet<String>,
    /// Every node scheduled at least once in this traversal
    pub visited: HashSet<String>,
    /// Execution step counter
    pub step: u32,
    /// Present while the session awaits external input
    pub suspension: Option<Suspension>,
    /// When this record was written
    pub saved_at: DateTime<Utc>,
}

/// Store error type; engine callers see these wrapped, never retried.
pub type StoreError = Box<dyn Error + Send + Sync>;

/// Pluggable checkpoint persistence, keyed by session id.
///
/// Implementations must make `save` atomic per session id: two operations
/// for the same session never interleave.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist a checkpoint, overwriting any prior record for the session.
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), StoreError>;

    /// Fetch the latest checkpoint for a session.
    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, StoreError>;

    /// Purge a session's record.
    async fn delete(&self, session_id: &str) -> Result<(), StoreError>;
}

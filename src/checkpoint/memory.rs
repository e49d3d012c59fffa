// SPDX-License-Identifier: MIT

//! In-memory checkpoint store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Checkpoint, CheckpointStore, StoreError};

/// Reference checkpoint store backed by a process-local map.
///
/// Clones share the same underlying records. The single lock gives each
/// session atomic read-modify-write; sessions only contend on the map
/// itself, never on each other's records.
#[derive(Clone)]
pub struct InMemorySaver {
    records: Arc<RwLock<HashMap<String, Checkpoint>>>,
}

impl InMemorySaver {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of sessions currently holding a record.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemorySaver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for InMemorySaver {
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.insert(checkpoint.session_id.clone(), checkpoint);
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(session_id).cloned())
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::Suspension;
    use crate::state::StateSnapshot;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::HashSet;

    fn checkpoint(session_id: &str, step: u32) -> Checkpoint {
        Checkpoint {
            session_id: session_id.to_string(),
            snapshot: StateSnapshot::new(),
            queue: vec!["approval".to_string()],
            completed: HashSet::from(["analyze".to_string()]),
            visited: HashSet::from(["analyze".to_string(), "approval".to_string()]),
            step,
            suspension: Some(Suspension {
                node: "approval".to_string(),
                payload: json!({"prompt": "approve?"}),
            }),
            saved_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let store = InMemorySaver::new();
        store.save(checkpoint("s1", 2)).await.unwrap();

        let loaded = store.load("s1").await.unwrap().unwrap();
        assert_eq!(loaded.session_id, "s1");
        assert_eq!(loaded.step, 2);
        assert_eq!(loaded.queue, vec!["approval"]);
        assert_eq!(
            loaded.suspension.unwrap().payload,
            json!({"prompt": "approve?"})
        );
    }

    #[tokio::test]
    async fn test_load_missing_session() {
        let store = InMemorySaver::new();
        assert!(store.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = InMemorySaver::new();
        store.save(checkpoint("s1", 1)).await.unwrap();
        store.save(checkpoint("s1", 5)).await.unwrap();

        let loaded = store.load("s1").await.unwrap().unwrap();
        assert_eq!(loaded.step, 5);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemorySaver::new();
        store.save(checkpoint("s1", 1)).await.unwrap();
        store.delete("s1").await.unwrap();
        assert!(store.load("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = InMemorySaver::new();
        store.save(checkpoint("s1", 1)).await.unwrap();
        store.save(checkpoint("s2", 9)).await.unwrap();

        assert_eq!(store.load("s1").await.unwrap().unwrap().step, 1);
        assert_eq!(store.load("s2").await.unwrap().unwrap().step, 9);

        store.delete("s1").await.unwrap();
        assert!(store.load("s2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clone_shares_records() {
        let store = InMemorySaver::new();
        let cloned = store.clone();
        cloned.save(checkpoint("s1", 1)).await.unwrap();
        assert!(store.load("s1").await.unwrap().is_some());
    }

    #[test]
    fn test_checkpoint_serde_round_trip() {
        let cp = checkpoint("s1", 3);
        let encoded = serde_json::to_string(&cp).unwrap();
        let decoded: Checkpoint = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.snapshot, cp.snapshot);
        assert_eq!(decoded.suspension, cp.suspension);
        assert_eq!(decoded.step, cp.step);
    }
}

// SPDX-License-Identifier: MIT

//! Per-session traversal bookkeeping

use chrono::Utc;
use std::collections::{HashSet, VecDeque};

use crate::checkpoint::{Checkpoint, Suspension};
use crate::state::StateSnapshot;

/// Mutable execution progress for one session.
///
/// Created fresh on `run`, rebuilt from a checkpoint on `resume`, and
/// written back to the store at the suspension and terminal points.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub session_id: String,
    pub snapshot: StateSnapshot,
    /// Nodes scheduled but not yet run, in scheduling order
    pub queue: VecDeque<String>,
    /// Nodes completed in this traversal
    pub completed: HashSet<String>,
    /// Every node scheduled at least once in this traversal
    pub visited: HashSet<String>,
    pub step: u32,
    pub suspension: Option<Suspension>,
}

impl ExecutionContext {
    /// Fresh context with the entry node scheduled.
    pub fn new(session_id: impl Into<String>, snapshot: StateSnapshot, entry: &str) -> Self {
        Self {
            session_id: session_id.into(),
            snapshot,
            queue: VecDeque::from([entry.to_string()]),
            completed: HashSet::new(),
            visited: HashSet::from([entry.to_string()]),
            step: 0,
            suspension: None,
        }
    }

    /// Schedule a node for execution.
    ///
    /// Clearing the completed mark lets routing and goto loops re-run a
    /// node within the same traversal.
    pub fn schedule(&mut self, node: &str) {
        self.completed.remove(node);
        self.visited.insert(node.to_string());
        if !self.queue.iter().any(|queued| queued == node) {
            self.queue.push_back(node.to_string());
        }
    }

    /// Snapshot the context into a persistable checkpoint.
    pub fn to_checkpoint(&self) -> Checkpoint {
        Checkpoint {
            session_id: self.session_id.clone(),
            snapshot: self.snapshot.clone(),
            queue: self.queue.iter().cloned().collect(),
            completed: self.completed.clone(),
            visited: self.visited.clone(),
            step: self.step,
            suspension: self.suspension.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Rebuild a context from a stored checkpoint.
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Self {
        Self {
            session_id: checkpoint.session_id,
            snapshot: checkpoint.snapshot,
            queue: checkpoint.queue.into(),
            completed: checkpoint.completed,
            visited: checkpoint.visited,
            step: checkpoint.step,
            suspension: checkpoint.suspension,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_schedules_entry() {
        let ctx = ExecutionContext::new("s1", StateSnapshot::new(), "start");
        assert_eq!(ctx.queue, VecDeque::from(["start".to_string()]));
        assert!(ctx.visited.contains("start"));
        assert_eq!(ctx.step, 0);
    }

    #[test]
    fn test_schedule_clears_completed_mark() {
        let mut ctx = ExecutionContext::new("s1", StateSnapshot::new(), "start");
        ctx.queue.clear();
        ctx.completed.insert("loop".to_string());

        ctx.schedule("loop");
        assert!(!ctx.completed.contains("loop"));
        assert!(ctx.queue.iter().any(|n| n == "loop"));
    }

    #[test]
    fn test_schedule_does_not_double_queue() {
        let mut ctx = ExecutionContext::new("s1", StateSnapshot::new(), "start");
        ctx.schedule("join");
        ctx.schedule("join");
        assert_eq!(ctx.queue.iter().filter(|n| *n == "join").count(), 1);
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let mut ctx = ExecutionContext::new("s1", StateSnapshot::new(), "start");
        ctx.schedule("next");
        ctx.completed.insert("start".to_string());
        ctx.step = 3;

        let rebuilt = ExecutionContext::from_checkpoint(ctx.to_checkpoint());
        assert_eq!(rebuilt.session_id, ctx.session_id);
        assert_eq!(rebuilt.queue, ctx.queue);
        assert_eq!(rebuilt.completed, ctx.completed);
        assert_eq!(rebuilt.visited, ctx.visited);
        assert_eq!(rebuilt.step, 3);
    }
}

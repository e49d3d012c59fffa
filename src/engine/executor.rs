// SPDX-License-Identifier: MIT

//! Execution engine: drives state through a compiled graph
//!
//! One logical thread of control per session: nodes run strictly
//! sequentially, parallel static branches included, and their partial
//! updates merge through the schema's reducers in execution order. The
//! engine returns control immediately on suspension; resumption is a
//! separate, later call against the checkpoint store.

use serde_json::{Map, Value};
use std::sync::Arc;

use super::context::ExecutionContext;
use crate::checkpoint::{Checkpoint, CheckpointStore, Suspension};
use crate::error::LatticeError;
use crate::graph::{CompiledGraph, END};
use crate::node::{NodeContext, NodeOutput, Resources};
use crate::state::{PartialUpdate, StateSnapshot};

/// Safety limit on node invocations per call chain.
const DEFAULT_MAX_STEPS: u32 = 100;

/// Result of one `run`/`resume` call.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Traversal reached the terminal marker; final state attached
    Complete(StateSnapshot),
    /// A node suspended awaiting external input
    Suspended { payload: Value },
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    /// Final state, if the traversal completed.
    pub fn into_state(self) -> Option<StateSnapshot> {
        match self {
            Self::Complete(snapshot) => Some(snapshot),
            Self::Suspended { .. } => None,
        }
    }
}

/// Per-call invocation settings: session identity plus the two ambient
/// side-channels handed to every node.
pub struct RunConfig {
    pub session_id: String,
    pub config: Map<String, Value>,
    pub resources: Resources,
}

impl RunConfig {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            config: Map::new(),
            resources: Resources::new(),
        }
    }

    /// Add one per-call configuration value.
    pub fn with_config_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Add a shared resource available to nodes via `ctx.resource::<T>()`.
    pub fn with_resource<T: std::any::Any + Send + Sync>(mut self, value: T) -> Self {
        self.resources.insert(value);
        self
    }
}

/// Walks a compiled graph: invokes nodes, applies reducers, evaluates
/// routers, and persists checkpoints at the suspension and terminal points.
pub struct Engine {
    graph: Arc<CompiledGraph>,
    store: Arc<dyn CheckpointStore>,
    max_steps: u32,
}

impl Engine {
    pub fn new(graph: Arc<CompiledGraph>, store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            graph,
            store,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Override the per-call-chain step limit.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Start a session: seed schema defaults, fold the caller's initial
    /// values through the reducers, and drive the traversal from the entry
    /// node until terminal or suspension.
    pub async fn run(
        &self,
        initial: PartialUpdate,
        cfg: RunConfig,
    ) -> Result<RunOutcome, LatticeError> {
        let schema = self.graph.schema();
        let snapshot = StateSnapshot::from_schema(schema).apply(schema, &initial)?;
        let mut ctx = ExecutionContext::new(cfg.session_id, snapshot, self.graph.entry());

        log::info!(
            "Session {}: starting at '{}'",
            ctx.session_id,
            self.graph.entry()
        );
        // Pre-call anchor: a fatal error later in this call leaves this
        // record as the session's last checkpoint.
        self.save(&ctx).await?;

        let ambient = NodeContext::new(cfg.config, cfg.resources);
        self.advance(&mut ctx, &ambient, None).await
    }

    /// Continue a suspended session, handing `resume_value` to the paused
    /// node's re-invocation through the dedicated resume accessor.
    pub async fn resume(
        &self,
        resume_value: Value,
        cfg: RunConfig,
    ) -> Result<RunOutcome, LatticeError> {
        let checkpoint = self
            .load(&cfg.session_id)
            .await?
            .ok_or_else(|| LatticeError::CheckpointNotFound(cfg.session_id.clone()))?;
        let suspension = checkpoint
            .suspension
            .clone()
            .ok_or_else(|| LatticeError::NoPendingSuspension(cfg.session_id.clone()))?;

        log::info!(
            "Session {}: resuming node '{}'",
            cfg.session_id,
            suspension.node
        );
        let mut ctx = ExecutionContext::from_checkpoint(checkpoint);
        ctx.suspension = None;

        let ambient = NodeContext::new(cfg.config, cfg.resources);
        self.advance(&mut ctx, &ambient, Some((suspension.node, resume_value)))
            .await
    }

    /// Latest checkpoint for a session, if any.
    pub async fn checkpoint(&self, session_id: &str) -> Result<Option<Checkpoint>, LatticeError> {
        self.load(session_id).await
    }

    /// Explicitly destroy a session's stored record.
    pub async fn purge(&self, session_id: &str) -> Result<(), LatticeError> {
        self.store
            .delete(session_id)
            .await
            .map_err(|e| LatticeError::Store(e.to_string()))
    }

    async fn advance(
        &self,
        ctx: &mut ExecutionContext,
        ambient: &NodeContext,
        mut pending_resume: Option<(String, Value)>,
    ) -> Result<RunOutcome, LatticeError> {
        loop {
            let node_name = match self.next_runnable(ctx) {
                Some(name) => name,
                None if ctx.queue.is_empty() => {
                    log::info!(
                        "Session {}: traversal complete after {} steps",
                        ctx.session_id,
                        ctx.step
                    );
                    self.save(ctx).await?;
                    return Ok(RunOutcome::Complete(ctx.snapshot.clone()));
                }
                None => {
                    return Err(LatticeError::Stalled(
                        ctx.queue.iter().cloned().collect(),
                    ));
                }
            };

            if ctx.step >= self.max_steps {
                log::error!(
                    "Session {}: exceeded max steps ({})",
                    ctx.session_id,
                    self.max_steps
                );
                return Err(LatticeError::MaxSteps(self.max_steps));
            }

            let node = self
                .graph
                .node(&node_name)
                .ok_or_else(|| LatticeError::routing(&node_name, &node_name))?
                .clone();

            log::info!(
                "Session {}: step {} executing node '{}'",
                ctx.session_id,
                ctx.step,
                node_name
            );

            // The resume value is visible to exactly one invocation: the
            // re-run of the node that suspended.
            let invocation_ctx = match pending_resume.take() {
                Some((target, value)) if target == node_name => ambient.with_resume(value),
                other => {
                    pending_resume = other;
                    ambient.clone()
                }
            };

            let output = match node.run(&ctx.snapshot, &invocation_ctx).await {
                Ok(output) => output,
                Err(e) => {
                    log::error!(
                        "Session {}: node '{}' failed: {}",
                        ctx.session_id,
                        node_name,
                        e
                    );
                    return Err(LatticeError::node_execution(
                        &node_name,
                        e.to_string(),
                        ctx.snapshot.clone(),
                    ));
                }
            };

            match output {
                NodeOutput::Update(update) => {
                    ctx.snapshot = ctx.snapshot.apply(self.graph.schema(), &update)?;
                    ctx.completed.insert(node_name.clone());
                    ctx.step += 1;
                    self.schedule_successors(ctx, &node_name)?;
                }
                NodeOutput::Goto { update, target } => {
                    if let Some(update) = update {
                        ctx.snapshot = ctx.snapshot.apply(self.graph.schema(), &update)?;
                    }
                    ctx.completed.insert(node_name.clone());
                    ctx.step += 1;
                    if target != END {
                        if !self.graph.contains_node(&target) {
                            return Err(LatticeError::routing(&node_name, &target));
                        }
                        log::info!(
                            "Session {}: '{}' jumped to '{}'",
                            ctx.session_id,
                            node_name,
                            target
                        );
                        ctx.schedule(&target);
                    }
                }
                NodeOutput::Suspend(payload) => {
                    log::info!(
                        "Session {}: node '{}' suspended",
                        ctx.session_id,
                        node_name
                    );
                    // Requeue at the front so resumption re-invokes this
                    // node from the start.
                    ctx.queue.push_front(node_name.clone());
                    ctx.suspension = Some(Suspension {
                        node: node_name,
                        payload: payload.clone(),
                    });
                    self.save(ctx).await?;
                    return Ok(RunOutcome::Suspended { payload });
                }
            }
        }
    }

    /// First queued node whose fan-in is satisfied: every static
    /// predecessor visited in this traversal has completed.
    fn next_runnable(&self, ctx: &mut ExecutionContext) -> Option<String> {
        let pos = ctx.queue.iter().position(|name| {
            self.graph
                .static_predecessors(name)
                .iter()
                .all(|pred| {
                    pred == name || !ctx.visited.contains(pred) || ctx.completed.contains(pred)
                })
        })?;
        ctx.queue.remove(pos)
    }

    /// Resolve and schedule the successors of a completed node. Conditional
    /// edges take precedence over static ones and route on the new state.
    fn schedule_successors(
        &self,
        ctx: &mut ExecutionContext,
        node_name: &str,
    ) -> Result<(), LatticeError> {
        if let Some(edge) = self.graph.conditional(node_name) {
            let (key, target) = edge.resolve(&ctx.snapshot);
            let target = target.ok_or_else(|| LatticeError::routing(node_name, &key))?;
            if target == END {
                return Ok(());
            }
            if !self.graph.contains_node(&target) {
                return Err(LatticeError::routing(node_name, &key));
            }
            log::info!(
                "Session {}: routed '{}' -> '{}' via key '{}'",
                ctx.session_id,
                node_name,
                target,
                key
            );
            ctx.schedule(&target);
        } else {
            for target in self.graph.successors(node_name) {
                ctx.schedule(target);
            }
        }
        Ok(())
    }

    async fn save(&self, ctx: &ExecutionContext) -> Result<(), LatticeError> {
        self.store
            .save(ctx.to_checkpoint())
            .await
            .map_err(|e| LatticeError::Store(e.to_string()))
    }

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, LatticeError> {
        self.store
            .load(session_id)
            .await
            .map_err(|e| LatticeError::Store(e.to_string()))
    }
}

// SPDX-License-Identifier: MIT

//! Node contract: the unit of execution in a graph
//!
//! A node reads the current snapshot plus two ambient side-channels and
//! returns one of three results: a partial update merged via reducers, a
//! suspension awaiting external input, or a goto that bypasses the node's
//! configured edges.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use crate::state::{PartialUpdate, StateSnapshot};

/// Error type node bodies are free to raise; the engine wraps it.
pub type NodeError = Box<dyn Error + Send + Sync>;

/// What a node hands back to the engine.
#[derive(Debug, Clone)]
pub enum NodeOutput {
    /// Partial update merged into state through the schema's reducers
    Update(PartialUpdate),
    /// Pause execution; the payload is returned to the caller verbatim
    Suspend(Value),
    /// Apply an optional update, then jump to `target`, ignoring the
    /// node's configured edges (self-loops, long jumps)
    Goto {
        update: Option<PartialUpdate>,
        target: String,
    },
}

impl NodeOutput {
    /// An update that changes nothing.
    pub fn empty() -> Self {
        Self::Update(PartialUpdate::new())
    }

    /// Suspend with a payload describing the input being requested.
    pub fn suspend(payload: Value) -> Self {
        Self::Suspend(payload)
    }

    /// Jump to `target` without updating state.
    pub fn goto(target: impl Into<String>) -> Self {
        Self::Goto {
            update: None,
            target: target.into(),
        }
    }

    /// Update state, then jump to `target`.
    pub fn goto_with(update: PartialUpdate, target: impl Into<String>) -> Self {
        Self::Goto {
            update: Some(update),
            target: target.into(),
        }
    }
}

/// A named unit of execution.
#[async_trait]
pub trait Node: Send + Sync {
    fn name(&self) -> String;

    async fn run(
        &self,
        state: &StateSnapshot,
        ctx: &NodeContext,
    ) -> Result<NodeOutput, NodeError>;
}

/// Per-process shared resources (database handles, clients), keyed by type.
///
/// These ride alongside state without participating in reducer merging or
/// checkpoint serialization.
#[derive(Default, Clone)]
pub struct Resources {
    inner: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource, replacing any previous value of the same type.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.inner.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Fetch a resource by type.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|any| any.downcast::<T>().ok())
    }
}

/// Read-only ambient inputs handed to every node invocation.
///
/// `config` is per-call metadata, `resources` are per-process handles, and
/// the resume slot carries externally supplied input for exactly one
/// re-invocation of a suspended node. None of these flow through reducers.
#[derive(Clone)]
pub struct NodeContext {
    config: Arc<Map<String, Value>>,
    resources: Arc<Resources>,
    resume: Option<Value>,
}

impl NodeContext {
    pub fn new(config: Map<String, Value>, resources: Resources) -> Self {
        Self {
            config: Arc::new(config),
            resources: Arc::new(resources),
            resume: None,
        }
    }

    pub(crate) fn with_resume(&self, resume: Value) -> Self {
        Self {
            config: Arc::clone(&self.config),
            resources: Arc::clone(&self.resources),
            resume: Some(resume),
        }
    }

    /// Per-call configuration map.
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    /// Look up one configuration value.
    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    /// Fetch a shared resource by type.
    pub fn resource<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.resources.get::<T>()
    }

    /// The resume value, present only when re-invoking a suspended node.
    ///
    /// This is the dedicated accessor for externally supplied input; resume
    /// values never appear as regular state fields.
    pub fn resume(&self) -> Option<&Value> {
        self.resume.as_ref()
    }
}

impl Default for NodeContext {
    fn default() -> Self {
        Self::new(Map::new(), Resources::new())
    }
}

type NodeFn =
    dyn Fn(&StateSnapshot, &NodeContext) -> Result<NodeOutput, NodeError> + Send + Sync;

/// Adapter turning a plain function into a [`Node`].
pub struct FnNode {
    name: String,
    f: Box<NodeFn>,
}

impl FnNode {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&StateSnapshot, &NodeContext) -> Result<NodeOutput, NodeError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            f: Box::new(f),
        }
    }

    /// Wrap in an `Arc` for registration with a graph builder.
    pub fn shared<F>(name: impl Into<String>, f: F) -> Arc<dyn Node>
    where
        F: Fn(&StateSnapshot, &NodeContext) -> Result<NodeOutput, NodeError>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl Node for FnNode {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn run(
        &self,
        state: &StateSnapshot,
        ctx: &NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        (self.f)(state, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FakePool {
        dsn: String,
    }

    #[tokio::test]
    async fn test_fn_node_runs() {
        let node = FnNode::new("echo", |state, _ctx| {
            let mut update = PartialUpdate::new();
            update.insert(
                "seen".to_string(),
                state.get("input").cloned().unwrap_or(Value::Null),
            );
            Ok(NodeOutput::Update(update))
        });

        let schema = crate::state::StateSchema::new();
        let state = StateSnapshot::new()
            .apply(&schema, &{
                let mut u = PartialUpdate::new();
                u.insert("input".to_string(), json!("hello"));
                u
            })
            .unwrap();

        let output = node.run(&state, &NodeContext::default()).await.unwrap();
        match output {
            NodeOutput::Update(u) => assert_eq!(u.get("seen"), Some(&json!("hello"))),
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_context_config_and_resources() {
        let mut config = Map::new();
        config.insert("model".to_string(), json!("fast"));

        let mut resources = Resources::new();
        resources.insert(FakePool {
            dsn: "postgres://localhost".to_string(),
        });

        let ctx = NodeContext::new(config, resources);
        assert_eq!(ctx.config_value("model"), Some(&json!("fast")));
        assert_eq!(
            ctx.resource::<FakePool>().unwrap().dsn,
            "postgres://localhost"
        );
        assert!(ctx.resource::<String>().is_none());
        assert!(ctx.resume().is_none());
    }

    #[test]
    fn test_with_resume_is_single_shot_data() {
        let ctx = NodeContext::default();
        let resumed = ctx.with_resume(json!("Alice"));
        assert_eq!(resumed.resume(), Some(&json!("Alice")));
        // The original context is untouched.
        assert!(ctx.resume().is_none());
    }
}

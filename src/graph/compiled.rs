// SPDX-License-Identifier: MIT

//! Frozen, executable graph handle
//!
//! Produced by [`GraphBuilder::compile`](crate::graph::GraphBuilder::compile);
//! immutable from then on. Static predecessor lists are precomputed here so
//! the engine can synchronize fan-in joins against the edge set instead of
//! counting at run time.

use std::collections::HashMap;
use std::sync::Arc;

use crate::node::Node;
use crate::state::{StateSchema, StateSnapshot};

/// Terminal marker: route or edge targets pointing here end the traversal.
pub const END: &str = "__end__";

/// Router function: computes a route key from the post-update state.
pub type RouterFn = Arc<dyn Fn(&StateSnapshot) -> String + Send + Sync>;

/// A conditional edge: router plus an optional route map.
///
/// With a map, the router's key is looked up and unknown keys are a routing
/// error. Without one (raw-name routing, a discouraged legacy mode) the key
/// is used directly as the target node name, so typos surface only at run
/// time.
pub struct ConditionalEdge {
    pub(crate) router: RouterFn,
    pub(crate) route_map: Option<HashMap<String, String>>,
}

impl ConditionalEdge {
    /// Run the router against `state` and resolve the target.
    ///
    /// Returns the route key and the resolved target, `None` when the key
    /// has no route-map entry.
    pub fn resolve(&self, state: &StateSnapshot) -> (String, Option<String>) {
        let key = (self.router)(state);
        let target = match &self.route_map {
            Some(map) => map.get(&key).cloned(),
            None => Some(key.clone()),
        };
        (key, target)
    }
}

/// Immutable graph: node set, edge set, entry point.
///
/// A node with a conditional edge routes exclusively through it; static
/// successors apply otherwise. A node with no outgoing edges ends its branch.
pub struct CompiledGraph {
    pub(crate) schema: StateSchema,
    pub(crate) nodes: HashMap<String, Arc<dyn Node>>,
    pub(crate) successors: HashMap<String, Vec<String>>,
    pub(crate) conditional: HashMap<String, ConditionalEdge>,
    pub(crate) predecessors: HashMap<String, Vec<String>>,
    pub(crate) entry: String,
}

impl std::fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("schema", &self.schema)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("successors", &self.successors)
            .field("conditional", &self.conditional.keys().collect::<Vec<_>>())
            .field("predecessors", &self.predecessors)
            .field("entry", &self.entry)
            .finish()
    }
}

impl CompiledGraph {
    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    pub fn node(&self, name: &str) -> Option<&Arc<dyn Node>> {
        self.nodes.get(name)
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Static successors of `name` (excluding `END`).
    pub fn successors(&self, name: &str) -> &[String] {
        self.successors.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Conditional edge for `name`, if registered.
    pub fn conditional(&self, name: &str) -> Option<&ConditionalEdge> {
        self.conditional.get(name)
    }

    /// Nodes with a static edge into `name`; the engine's fan-in join waits
    /// on the subset of these visited in the current traversal.
    pub fn static_predecessors(&self, name: &str) -> &[String] {
        self.predecessors
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

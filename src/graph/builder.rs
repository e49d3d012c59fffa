// SPDX-License-Identifier: MIT

//! Graph construction and validation
//!
//! The builder accumulates nodes and edges, then `compile()` validates the
//! structure and freezes it into a [`CompiledGraph`]. Duplicate node names
//! fail immediately; dangling edge references and a missing entry point fail
//! at compile time. Unreachable nodes are a warning, not fatal.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use super::compiled::{CompiledGraph, ConditionalEdge, RouterFn, END};
use crate::error::GraphError;
use crate::node::Node;
use crate::state::{StateSchema, StateSnapshot};

/// Mutable graph-under-construction.
pub struct GraphBuilder {
    schema: StateSchema,
    nodes: HashMap<String, Arc<dyn Node>>,
    node_order: Vec<String>,
    edges: Vec<(String, String)>,
    conditional: HashMap<String, ConditionalEdge>,
    entry: Option<String>,
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("schema", &self.schema)
            .field("nodes", &self.node_order)
            .field("edges", &self.edges)
            .field("conditional", &self.conditional.keys().collect::<Vec<_>>())
            .field("entry", &self.entry)
            .finish()
    }
}

impl GraphBuilder {
    /// Start a graph over the given state schema.
    pub fn new(schema: StateSchema) -> Self {
        Self {
            schema,
            nodes: HashMap::new(),
            node_order: Vec::new(),
            edges: Vec::new(),
            conditional: HashMap::new(),
            entry: None,
        }
    }

    /// Register a node. Fails if the name is already taken.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        node: Arc<dyn Node>,
    ) -> Result<&mut Self, GraphError> {
        let name = name.into();
        if self.nodes.contains_key(&name) {
            return Err(GraphError::DuplicateNode(name));
        }
        self.node_order.push(name.clone());
        self.nodes.insert(name, node);
        Ok(self)
    }

    /// Add a static unconditional transition. `to` may be [`END`].
    /// Multiple edges out of one node fan out into parallel branches.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Attach a conditional edge: the router computes a route key from the
    /// post-update state, and `route_map` maps keys to targets (or [`END`]).
    ///
    /// Passing `None` enables raw-name routing, where the key is used
    /// directly as the target node name. Prefer explicit maps: raw mode
    /// defers every typo to a run-time routing error.
    pub fn add_conditional_edges<F>(
        &mut self,
        from: impl Into<String>,
        router: F,
        route_map: Option<HashMap<String, String>>,
    ) -> &mut Self
    where
        F: Fn(&StateSnapshot) -> String + Send + Sync + 'static,
    {
        let router: RouterFn = Arc::new(router);
        self.conditional
            .insert(from.into(), ConditionalEdge { router, route_map });
        self
    }

    /// Set the entry point. Calling again replaces the previous entry.
    pub fn set_entry(&mut self, name: impl Into<String>) -> &mut Self {
        self.entry = Some(name.into());
        self
    }

    /// Validate and freeze the graph.
    pub fn compile(self) -> Result<CompiledGraph, GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::Empty);
        }

        let entry = self.entry.clone().ok_or(GraphError::MissingEntry)?;
        if !self.nodes.contains_key(&entry) {
            return Err(GraphError::UnknownNode {
                node: entry,
                referenced_by: "entry point".to_string(),
            });
        }

        let mut successors: HashMap<String, Vec<String>> = HashMap::new();
        let mut predecessors: HashMap<String, Vec<String>> = HashMap::new();
        for (from, to) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::UnknownNode {
                    node: from.clone(),
                    referenced_by: format!("edge {from} -> {to}"),
                });
            }
            if to != END && !self.nodes.contains_key(to) {
                return Err(GraphError::UnknownNode {
                    node: to.clone(),
                    referenced_by: format!("edge {from} -> {to}"),
                });
            }
            if to != END {
                successors.entry(from.clone()).or_default().push(to.clone());
                predecessors.entry(to.clone()).or_default().push(from.clone());
            }
        }

        for (from, edge) in &self.conditional {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::UnknownNode {
                    node: from.clone(),
                    referenced_by: "conditional edge source".to_string(),
                });
            }
            if let Some(map) = &edge.route_map {
                for (key, target) in map {
                    if target != END && !self.nodes.contains_key(target) {
                        return Err(GraphError::UnknownNode {
                            node: target.clone(),
                            referenced_by: format!(
                                "route '{key}' of conditional edge from '{from}'"
                            ),
                        });
                    }
                }
            }
        }

        self.warn_unreachable(&entry, &successors);

        Ok(CompiledGraph {
            schema: self.schema,
            nodes: self.nodes,
            successors,
            conditional: self.conditional,
            predecessors,
            entry,
        })
    }

    /// Walk everything reachable from the entry over static edges and
    /// route-map targets; raw routers cannot be walked statically, so their
    /// sources contribute nothing beyond themselves.
    fn warn_unreachable(&self, entry: &str, successors: &HashMap<String, Vec<String>>) {
        let mut reachable: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        reachable.insert(entry);
        queue.push_back(entry);

        while let Some(name) = queue.pop_front() {
            let static_targets = successors
                .get(name)
                .into_iter()
                .flatten()
                .map(String::as_str);
            let routed_targets = self
                .conditional
                .get(name)
                .and_then(|e| e.route_map.as_ref())
                .into_iter()
                .flat_map(|map| map.values())
                .map(String::as_str);

            for target in static_targets.chain(routed_targets) {
                if target != END && reachable.insert(target) {
                    queue.push_back(target);
                }
            }
        }

        for name in &self.node_order {
            if !reachable.contains(name.as_str()) {
                log::warn!("Node '{}' is not reachable from entry '{}'", name, entry);
            }
        }
    }
}

/// Convenience for building route maps from string pairs.
pub fn routes<const N: usize>(pairs: [(&str, &str); N]) -> HashMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

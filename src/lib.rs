// SPDX-License-Identifier: MIT

//! lattice-rs: a state-merging graph executor
//!
//! Build a graph of named nodes over a shared, schema-governed state, then
//! run it to completion or suspension:
//!
//! - Nodes return partial updates merged via per-field [reducers](state::Reducer),
//!   a suspension awaiting external input, or a goto overriding their edges.
//! - Routing is static (`add_edge`), conditional (router + route map), or
//!   dynamic (`NodeOutput::Goto`).
//! - Suspended sessions persist through a pluggable
//!   [checkpoint store](checkpoint::CheckpointStore) and resume across
//!   process boundaries, with the external input exposed through a
//!   dedicated accessor rather than the regular state path.
//!
//! Node bodies are opaque to the engine: LLM calls, tools, and other side
//! effects live entirely inside them.

pub mod checkpoint;
pub mod engine;
pub mod error;
pub mod graph;
pub mod node;
pub mod state;

pub use checkpoint::{Checkpoint, CheckpointStore, InMemorySaver, Suspension};
pub use engine::{Engine, RunConfig, RunOutcome};
pub use error::{GraphError, LatticeError, ReducerError};
pub use graph::{routes, CompiledGraph, GraphBuilder, END};
pub use node::{FnNode, Node, NodeContext, NodeOutput, Resources};
pub use state::{PartialUpdate, Reducer, StateSchema, StateSnapshot};

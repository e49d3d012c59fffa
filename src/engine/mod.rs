// SPDX-License-Identifier: MIT

//! Graph execution
//!
//! The [`Engine`] walks a [`CompiledGraph`](crate::graph::CompiledGraph) to
//! completion or suspension, merging each node's partial update into the
//! session's state through the schema's reducers.

mod context;
mod executor;

pub use context::ExecutionContext;
pub use executor::{Engine, RunConfig, RunOutcome};

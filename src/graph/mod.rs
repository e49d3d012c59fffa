// SPDX-License-Identifier: MIT

//! Graph definition: nodes, edges, entry point, terminal marker
//!
//! Build with [`GraphBuilder`], freeze with `compile()`, execute via
//! [`Engine`](crate::engine::Engine).

mod builder;
mod compiled;

pub use builder::{routes, GraphBuilder};
pub use compiled::{CompiledGraph, ConditionalEdge, RouterFn, END};

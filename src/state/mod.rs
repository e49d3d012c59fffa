// SPDX-License-Identifier: MIT

//! State management for graph execution
//!
//! This module provides:
//! - `StateSchema` - per-field merge policies and defaults
//! - `Reducer` - pure strategies for combining old and incoming values
//! - `StateSnapshot` - immutable point-in-time state, advanced by `apply`

mod reducer;
mod schema;
mod snapshot;

pub use reducer::{FilterFn, ReduceFn, Reducer};
pub use schema::{FieldDef, FieldType, StateSchema};
pub use snapshot::{PartialUpdate, StateSnapshot};

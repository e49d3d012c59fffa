// SPDX-License-Identifier: MIT

//! Point-in-time state snapshots
//!
//! A snapshot is never mutated in place: applying a partial update produces
//! the next snapshot and leaves the current one untouched, so a failing
//! reducer aborts the whole step with the previous snapshot still
//! authoritative.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::schema::StateSchema;
use crate::error::ReducerError;

/// A node's proposed changes: a mapping touching a subset of schema fields.
pub type PartialUpdate = serde_json::Map<String, Value>;

/// Immutable-per-step view of the shared workflow state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    fields: HashMap<String, Value>,
}

impl StateSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a snapshot seeded with the schema's declared defaults.
    /// Fields without a default remain absent.
    pub fn from_schema(schema: &StateSchema) -> Self {
        let fields = schema
            .fields
            .iter()
            .filter_map(|(name, def)| def.default.clone().map(|v| (name.clone(), v)))
            .collect();
        Self { fields }
    }

    /// Apply a partial update through the schema's reducers, producing the
    /// next snapshot.
    ///
    /// Either every field in the update commits or none does: the first
    /// reducer failure discards the partially built snapshot and `self`
    /// remains the last valid state. Keys absent from the update carry over
    /// unchanged.
    pub fn apply(
        &self,
        schema: &StateSchema,
        update: &PartialUpdate,
    ) -> Result<StateSnapshot, ReducerError> {
        let mut fields = self.fields.clone();
        for (key, incoming) in update {
            let reducer = schema.reducer_for(key);
            let merged = reducer.apply(key, fields.get(key), incoming)?;
            fields.insert(key.clone(), merged);
        }
        Ok(Self { fields })
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a nested value using dot notation (e.g. "result.intent")
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Whether the field is present
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Convert the snapshot to a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// All field names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }
}

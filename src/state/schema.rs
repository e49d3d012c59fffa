// SPDX-License-Identifier: MIT

//! State schema definitions
//!
//! A schema maps field names to their merge behavior. Every field a node
//! mutates should appear here; fields left out fall back to last-write-wins.
//! Schemas can be built in code or declared in YAML:
//!
//! ```yaml
//! steps:
//!   type: number
//!   reducer: sum
//!   default: 0
//! recent:
//!   type: array
//!   reducer: { window: { size: 3 } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::reducer::Reducer;

/// Schema defining the workflow state structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateSchema {
    /// Field definitions
    #[serde(flatten)]
    pub fields: HashMap<String, FieldDef>,
}

/// Definition of a single state field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDef {
    /// Declared type, informational only
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    /// Reducer for merging values
    #[serde(default)]
    pub reducer: Reducer,
    /// Default value seeded into fresh snapshots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Supported field types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl StateSchema {
    /// Create an empty schema (every field last-write-wins).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a schema from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Register a field with a reducer and no default.
    pub fn field(mut self, name: impl Into<String>, reducer: Reducer) -> Self {
        self.fields.insert(
            name.into(),
            FieldDef {
                field_type: None,
                reducer,
                default: None,
            },
        );
        self
    }

    /// Register a field with a reducer and a default value.
    pub fn field_with_default(
        mut self,
        name: impl Into<String>,
        reducer: Reducer,
        default: Value,
    ) -> Self {
        self.fields.insert(
            name.into(),
            FieldDef {
                field_type: None,
                reducer,
                default: Some(default),
            },
        );
        self
    }

    /// Reducer for a field; absent fields overwrite.
    pub fn reducer_for(&self, name: &str) -> &Reducer {
        const OVERWRITE: &Reducer = &Reducer::Overwrite;
        self.fields
            .get(name)
            .map(|def| &def.reducer)
            .unwrap_or(OVERWRITE)
    }
}

// SPDX-License-Identifier: MIT

//! Reducers: pure merge strategies for state fields
//!
//! A reducer combines a field's current value with a node's incoming value
//! and returns a fresh value. Reducers never mutate their inputs and must
//! tolerate `current = None` (first write). Configured variants (window
//! size, decay weight) carry their configuration as data so they stay pure
//! and independently testable; arbitrary logic goes through the closure
//! variants built with [`Reducer::filtered_append`] and [`Reducer::custom`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::sync::Arc;

use crate::error::ReducerError;

/// Predicate used by the filtered-append reducer.
pub type FilterFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// User-supplied merge function: `(current, incoming) -> new`.
pub type ReduceFn =
    Arc<dyn Fn(Option<&Value>, &Value) -> Result<Value, String> + Send + Sync>;

/// Merge strategy for a single state field.
///
/// The data-only variants deserialize from schema YAML (unit variants as
/// plain strings, configured variants as externally tagged maps, e.g.
/// `reducer: { window: { size: 3 } }`). The closure variants are
/// construction-time only.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    /// Replace the value (last write wins; default for schema-less fields)
    #[default]
    Overwrite,
    /// Append to an array (arrays extend, scalars push)
    Append,
    /// Append, skipping items already present
    AppendUnique,
    /// Numeric running sum
    Sum,
    /// Keep the numeric maximum
    Max,
    /// Exponentially weighted average: `current * (1 - weight) + new * weight`
    RunningAverage { weight: f64 },
    /// Recursive object merge
    DeepMerge,
    /// Array-as-set union, first-seen order preserved
    SetUnion,
    /// Append, then keep only the last `size` items
    Window { size: usize },
    /// Append items passing a predicate
    #[serde(skip)]
    FilteredAppend(FilterFn),
    /// Arbitrary user-supplied merge function
    #[serde(skip)]
    Custom(ReduceFn),
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Reducer {
    /// Build a bounded-window reducer keeping the last `size` items.
    pub fn window(size: usize) -> Self {
        Self::Window { size }
    }

    /// Build a weighted running-average reducer.
    pub fn running_average(weight: f64) -> Self {
        Self::RunningAverage { weight }
    }

    /// Build a filtered-append reducer from a predicate.
    pub fn filtered_append<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::FilteredAppend(Arc::new(predicate))
    }

    /// Build a reducer from an arbitrary merge function.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>, &Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Append => "append",
            Self::AppendUnique => "append_unique",
            Self::Sum => "sum",
            Self::Max => "max",
            Self::RunningAverage { .. } => "running_average",
            Self::DeepMerge => "deep_merge",
            Self::SetUnion => "set_union",
            Self::Window { .. } => "window",
            Self::FilteredAppend(_) => "filtered_append",
            Self::Custom(_) => "custom",
        }
    }

    /// Combine `current` and `incoming` into a fresh value.
    ///
    /// `field` is only used for error reporting.
    pub fn apply(
        &self,
        field: &str,
        current: Option<&Value>,
        incoming: &Value,
    ) -> Result<Value, ReducerError> {
        match self {
            Self::Overwrite => Ok(incoming.clone()),
            Self::Append => {
                let mut items = self.current_array(field, current)?;
                extend_with(&mut items, incoming);
                Ok(Value::Array(items))
            }
            Self::AppendUnique => {
                let mut items = self.current_array(field, current)?;
                for item in incoming_items(incoming) {
                    if !items.contains(item) {
                        items.push(item.clone());
                    }
                }
                Ok(Value::Array(items))
            }
            Self::Sum => {
                let incoming = self.require_number(field, incoming)?;
                match current {
                    None => Ok(Value::Number(incoming)),
                    Some(cur) => {
                        let cur = self.require_number(field, cur)?;
                        Ok(Value::Number(add_numbers(&cur, &incoming)))
                    }
                }
            }
            Self::Max => {
                let new = self.require_f64(field, incoming)?;
                match current {
                    None => Ok(incoming.clone()),
                    Some(cur) => {
                        let cur_f = self.require_f64(field, cur)?;
                        if new > cur_f {
                            Ok(incoming.clone())
                        } else {
                            Ok(cur.clone())
                        }
                    }
                }
            }
            Self::RunningAverage { weight } => {
                let new = self.require_f64(field, incoming)?;
                match current {
                    None => Ok(incoming.clone()),
                    Some(cur) => {
                        let cur = self.require_f64(field, cur)?;
                        let avg = cur * (1.0 - weight) + new * weight;
                        Ok(json_f64(avg))
                    }
                }
            }
            Self::DeepMerge => {
                let incoming_obj = match incoming {
                    Value::Object(obj) => obj,
                    _ => return Err(self.type_mismatch(field, "an object")),
                };
                match current {
                    None => Ok(incoming.clone()),
                    Some(Value::Object(cur)) => {
                        let mut merged = cur.clone();
                        deep_merge(&mut merged, incoming_obj);
                        Ok(Value::Object(merged))
                    }
                    Some(_) => Err(self.type_mismatch(field, "an object")),
                }
            }
            Self::SetUnion => {
                let mut items = self.current_array(field, current)?;
                let incoming_arr = match incoming {
                    Value::Array(arr) => arr.as_slice(),
                    _ => return Err(self.type_mismatch(field, "an array")),
                };
                for item in incoming_arr {
                    if !items.contains(item) {
                        items.push(item.clone());
                    }
                }
                Ok(Value::Array(items))
            }
            Self::Window { size } => {
                let mut items = self.current_array(field, current)?;
                extend_with(&mut items, incoming);
                if items.len() > *size {
                    items.drain(..items.len() - size);
                }
                Ok(Value::Array(items))
            }
            Self::FilteredAppend(predicate) => {
                let mut items = self.current_array(field, current)?;
                for item in incoming_items(incoming) {
                    if predicate(item) {
                        items.push(item.clone());
                    }
                }
                Ok(Value::Array(items))
            }
            Self::Custom(f) => f(current, incoming).map_err(|message| ReducerError::Custom {
                field: field.to_string(),
                message,
            }),
        }
    }

    fn current_array(
        &self,
        field: &str,
        current: Option<&Value>,
    ) -> Result<Vec<Value>, ReducerError> {
        match current {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(arr)) => Ok(arr.clone()),
            Some(_) => Err(self.type_mismatch(field, "an array")),
        }
    }

    fn require_number(&self, field: &str, value: &Value) -> Result<Number, ReducerError> {
        match value {
            Value::Number(n) => Ok(n.clone()),
            _ => Err(self.type_mismatch(field, "a number")),
        }
    }

    fn require_f64(&self, field: &str, value: &Value) -> Result<f64, ReducerError> {
        value
            .as_f64()
            .ok_or_else(|| self.type_mismatch(field, "a number"))
    }

    fn type_mismatch(&self, field: &str, expected: &'static str) -> ReducerError {
        ReducerError::TypeMismatch {
            field: field.to_string(),
            reducer: self.name(),
            expected,
        }
    }
}

/// Incoming arrays are appended item by item; scalars are a single item.
fn incoming_items(incoming: &Value) -> &[Value] {
    match incoming {
        Value::Array(arr) => arr.as_slice(),
        other => std::slice::from_ref(other),
    }
}

fn extend_with(items: &mut Vec<Value>, incoming: &Value) {
    match incoming {
        Value::Array(arr) => items.extend(arr.iter().cloned()),
        other => items.push(other.clone()),
    }
}

/// Integer addition when both sides are integers, float otherwise.
fn add_numbers(a: &Number, b: &Number) -> Number {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return Number::from(a + b);
    }
    let sum = a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0);
    Number::from_f64(sum).unwrap_or_else(|| Number::from(0))
}

fn json_f64(v: f64) -> Value {
    Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn deep_merge(target: &mut Map<String, Value>, incoming: &Map<String, Value>) {
    for (key, value) in incoming {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(new)) => deep_merge(existing, new),
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

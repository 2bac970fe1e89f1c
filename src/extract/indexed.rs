//! Flat index-reference page state.
//!
//! Some frameworks serialize their whole state as a single JSON array in
//! which objects refer to their field values by position:
//!
//! ```text
//! [["ShallowReactive", 1], {"rates": 2}, [3, 6], {"term": 4, "rate": 5}, "3 mån", "3,45", ...]
//! ```
//!
//! An object field whose value is a non-negative integer is an index into the
//! array. The element found there is a literal, unless it is a framework
//! wrapper tuple such as `["Reactive", 12]`, which is one more hop. Every index
//! is bounds-checked and a chain may take at most [`MAX_HOPS`] hops.

use serde_json::{Map, Value};

use super::payload::scalar_text;
use crate::error::{ExtractError, FieldError};

/// Longest chain of indirections followed before giving up.
pub const MAX_HOPS: usize = 4;

const WRAPPERS: &[&str] = &["Reactive", "ShallowReactive", "Ref", "ShallowRef", "EmptyRef", "EmptyShallowRef"];

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPayload {
    items: Vec<Value>,
}

impl IndexedPayload {
    pub fn parse(raw: &str) -> Result<Self, ExtractError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| ExtractError::shape(format!("invalid JSON: {e}")))?;
        match value {
            Value::Array(items) if !items.is_empty() => Ok(Self { items }),
            Value::Array(_) => Err(ExtractError::shape("indexed payload is empty")),
            _ => Err(ExtractError::shape("indexed payload is not an array")),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Follow `index` (and any wrapper tuples behind it) to a concrete value.
    pub fn resolve(&self, index: usize) -> Result<&Value, FieldError> {
        let mut current = index;
        for _ in 0..MAX_HOPS {
            let value = self
                .get(current)
                .ok_or_else(|| FieldError::Unresolvable(format!("index {current} out of range ({})", self.len())))?;
            match wrapped_index(value) {
                Some(next) => current = next,
                None => return Ok(value),
            }
        }
        Err(FieldError::Unresolvable(format!("more than {MAX_HOPS} hops from index {index}")))
    }

    /// A field value as stored in an object: integers are references, anything
    /// else is already the value.
    pub fn resolve_field<'a>(&'a self, value: &'a Value) -> Result<&'a Value, FieldError> {
        match as_index(value) {
            Some(index) => self.resolve(index),
            None => Ok(value),
        }
    }

    /// Objects in the array that carry every one of `keys` (top-level segment
    /// of dotted keys).
    pub fn records_with_fields(&self, keys: &[&str]) -> Vec<&Map<String, Value>> {
        self.items
            .iter()
            .filter_map(Value::as_object)
            .filter(|obj| {
                keys.iter()
                    .all(|key| obj.contains_key(key.split('.').next().unwrap_or(key)))
            })
            .collect()
    }

    /// Resolve `key` on `record` to text; dotted keys hop through nested objects.
    pub fn field_text(&self, record: &Map<String, Value>, key: &str) -> Result<String, FieldError> {
        let mut object = record;
        let mut parts = key.split('.').peekable();
        while let Some(part) = parts.next() {
            let raw = object.get(part).ok_or_else(|| FieldError::MissingField(key.to_string()))?;
            let value = self.resolve_field(raw)?;
            if parts.peek().is_none() {
                return scalar_text(value)
                    .ok_or_else(|| FieldError::Unresolvable(format!("field '{key}' is not a scalar")));
            }
            object = value
                .as_object()
                .ok_or_else(|| FieldError::Unresolvable(format!("'{part}' in '{key}' is not an object")))?;
        }
        Err(FieldError::MissingField(key.to_string()))
    }
}

fn as_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        _ => None,
    }
}

fn wrapped_index(value: &Value) -> Option<usize> {
    match value.as_array()?.as_slice() {
        [Value::String(tag), target] if WRAPPERS.contains(&tag.as_str()) => as_index(target),
        _ => None,
    }
}

// SPDX-License-Identifier: Apache-2.0

//! Field-path parsing and extraction.
//!
//! Join rules address fields inside arbitrarily nested JSON with a compact
//! notation:
//!
//! - `root[].field` iterates the payload itself and reads `field` per element
//! - `root.items[].field` looks up the `items` sub-array and reads `field`
//!   per element of it
//! - anything else is read as-is from each element of the payload
//!
//! Paths are parsed once into [`FieldPath`] and reused for every record.

use std::fmt;

use serde_json::Value;

use crate::engine::error::{EngineError, EngineResult};

const ELEMENT_PREFIX: &str = "root[].";
const NESTED_PREFIX: &str = "root.";

/// A parsed field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    /// Unmarked path, read from each element of the top-level array
    ScalarAtRoot(String),
    /// `root[].field`
    ElementField(String),
    /// `root.<array_key>[].<field>`
    NestedArray { array_key: String, field: String },
}

impl FieldPath {
    pub fn parse(path: &str) -> Self {
        if path.contains(ELEMENT_PREFIX) {
            return Self::ElementField(path.replacen(ELEMENT_PREFIX, "", 1));
        }

        if let Some(rest) = path.strip_prefix(NESTED_PREFIX) {
            if let Some(close) = rest.find(']') {
                let head = &rest[..close];
                let array_key = match head.rfind('[') {
                    Some(open) => &head[..open],
                    None => head,
                };
                let tail = &rest[close + 1..];
                let field = tail.strip_prefix('.').unwrap_or(tail);
                return Self::NestedArray {
                    array_key: array_key.to_string(),
                    field: field.to_string(),
                };
            }
        }

        Self::ScalarAtRoot(path.to_string())
    }

    /// The per-record path compared during a join.
    pub fn field(&self) -> &str {
        match self {
            Self::ScalarAtRoot(field) | Self::ElementField(field) => field,
            Self::NestedArray { field, .. } => field,
        }
    }

    /// Selects the array this path iterates over inside `container`.
    ///
    /// A missing or `null` sub-array selects nothing. Any other non-array
    /// value is a malformed payload.
    pub fn select_array<'a>(&self, container: &'a Value) -> EngineResult<&'a [Value]> {
        let target = match self {
            Self::ScalarAtRoot(_) | Self::ElementField(_) => Some(container),
            Self::NestedArray { array_key, .. } => lookup(container, array_key),
        };

        match target {
            None | Some(Value::Null) => Ok(Default::default()),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(other) => Err(EngineError::invalid_response(format!(
                "path '{self}' expected an array, found {}",
                value_kind(other)
            ))),
        }
    }

    /// Reads this path's field from a single record.
    pub fn read<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        lookup(record, self.field())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScalarAtRoot(field) => f.write_str(field),
            Self::ElementField(field) => write!(f, "{ELEMENT_PREFIX}{field}"),
            Self::NestedArray { array_key, field } => {
                write!(f, "{NESTED_PREFIX}{array_key}[].{field}")
            }
        }
    }
}

/// Nested-key lookup.
///
/// A key equal to the whole path wins; otherwise the path is walked one
/// `.`-separated segment at a time, indexing arrays by numeric segments.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    if let Some(found) = value.as_object().and_then(|map| map.get(path)) {
        return Some(found);
    }

    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Extracts every value addressed by `path` inside `container`.
///
/// Elements lacking the field are skipped.
pub fn resolve<'a>(path: &str, container: &'a Value) -> EngineResult<Vec<&'a Value>> {
    let parsed = FieldPath::parse(path);
    Ok(parsed
        .select_array(container)?
        .iter()
        .filter_map(|record| parsed.read(record))
        .collect())
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! Turns one semi-structured staging column into flat, typed sub-records.
//!
//! Every column is described by a [`Shape`]. The extractor never fails: text that
//! is not JSON, elements of the wrong kind and sub-fields of the wrong type are
//! dropped at the smallest possible granularity so the rest of the batch survives.

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::TARGET_EXTRACT;

/// Key under which scalar shapes store their single value.
pub const VALUE_KEY: &str = "value";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
}

/// A named path into an object element. Paths may descend one or more levels,
/// e.g. `["posted_on", "day"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath {
    pub name: &'static str,
    pub path: &'static [&'static str],
    pub kind: FieldKind,
}

impl FieldPath {
    pub const fn text(name: &'static str, path: &'static [&'static str]) -> Self {
        Self {
            name,
            path,
            kind: FieldKind::Text,
        }
    }

    pub const fn integer(name: &'static str, path: &'static [&'static str]) -> Self {
        Self {
            name,
            path,
            kind: FieldKind::Integer,
        }
    }
}

/// Expected structure of a staging column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Plain column text, not JSON encoded.
    Scalar,
    /// JSON array of bare values.
    ArrayOfScalar,
    /// JSON array of objects, each flattened through the declared paths.
    ArrayOfObject(&'static [FieldPath]),
    /// Fixed two element JSON array of integers.
    ScalarPair {
        first: &'static str,
        second: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
}

/// One flattened array element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubRecord {
    fields: BTreeMap<&'static str, FieldValue>,
}

impl SubRecord {
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.fields.get(name) {
            Some(FieldValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn insert(&mut self, name: &'static str, value: Option<FieldValue>) {
        if let Some(value) = value {
            self.fields.insert(name, value);
        }
    }

    fn non_empty(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }
}

/// Extracts the sub-records held in `raw` according to `shape`.
///
/// Absent, blank and unparseable values all produce an empty sequence. The raw
/// text is parsed in full up front; only the per-element projection is lazy.
pub fn extract(raw: Option<&str>, shape: Shape) -> impl Iterator<Item = SubRecord> {
    elements(raw, shape)
        .into_iter()
        .filter_map(move |element| extract_element(element, shape))
}

fn elements(raw: Option<&str>, shape: Shape) -> Vec<Value> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Vec::new();
    };

    if shape == Shape::Scalar {
        return vec![Value::String(raw.to_string())];
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => match shape {
            Shape::ScalarPair { .. } => vec![Value::Array(items)],
            _ => items,
        },
        Ok(Value::Null) => Vec::new(),
        Ok(other) => {
            debug!(
                target: TARGET_EXTRACT,
                "Expected a JSON array, found {}; skipping field", json_kind(&other)
            );
            Vec::new()
        }
        Err(e) => {
            debug!(target: TARGET_EXTRACT, "Field is not valid JSON ({}); skipping", e);
            Vec::new()
        }
    }
}

fn extract_element(element: Value, shape: Shape) -> Option<SubRecord> {
    let mut record = SubRecord::default();
    match shape {
        Shape::Scalar | Shape::ArrayOfScalar => {
            record.insert(VALUE_KEY, text_value(&element));
        }
        Shape::ArrayOfObject(paths) => {
            if !element.is_object() {
                debug!(
                    target: TARGET_EXTRACT,
                    "Skipping {} element in array of objects", json_kind(&element)
                );
                return None;
            }
            for field in paths {
                let value = lookup(&element, field.path).and_then(|value| match field.kind {
                    FieldKind::Text => text_value(value),
                    FieldKind::Integer => integer_value(value),
                });
                record.insert(field.name, value);
            }
            // Kept even when empty; defaults fill every field downstream
            return Some(record);
        }
        Shape::ScalarPair { first, second } => {
            let items = element.as_array()?;
            record.insert(first, items.first().and_then(integer_value));
            record.insert(second, items.get(1).and_then(integer_value));
        }
    }
    record.non_empty()
}

fn lookup<'a>(element: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(element, |current, segment| current.get(*segment))
}

/// Text rendering of a scalar JSON value, trimmed; blank text counts as absent.
fn text_value(value: &Value) -> Option<FieldValue> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(FieldValue::Text(text))
}

fn integer_value(value: &Value) -> Option<FieldValue> {
    let integer = match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    Some(FieldValue::Integer(integer))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

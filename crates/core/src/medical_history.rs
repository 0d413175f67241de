//! Recursive merge for partial medical-history updates.
//!
//! Medical history is a nested record of free-form sections. A partial update
//! merges section by section instead of replacing the whole record:
//!
//! - record + record: merged key by key, recursively
//! - anything else: the patch value replaces the base value
//! - `null` in the patch: ignored, the base value is kept

use std::collections::BTreeMap;

use serde_json::Value;

/// A medical-history node: either a nested record or a leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryValue {
    /// Leaf value (string, number, bool, array). Never `null`.
    Scalar(Value),
    Record(BTreeMap<String, HistoryValue>),
}

impl HistoryValue {
    /// Build from JSON. Returns `None` for `null`; nulls nested inside
    /// objects are dropped.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Object(map) => Some(Self::Record(
                map.into_iter()
                    .filter_map(|(k, v)| Self::from_json(v).map(|v| (k, v)))
                    .collect(),
            )),
            other => Some(Self::Scalar(other)),
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            Self::Scalar(v) => v,
            Self::Record(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect(),
            ),
        }
    }
}

/// Merge `patch` into `base`.
pub fn merge(base: HistoryValue, patch: HistoryValue) -> HistoryValue {
    match (base, patch) {
        (HistoryValue::Record(mut base_map), HistoryValue::Record(patch_map)) => {
            for (key, patch_value) in patch_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => merge(base_value, patch_value),
                    None => patch_value,
                };
                base_map.insert(key, merged);
            }
            HistoryValue::Record(base_map)
        }
        (_, patch) => patch,
    }
}

/// Merge two JSON documents with [`merge`] semantics.
pub fn merge_json(base: Value, patch: Value) -> Value {
    match (HistoryValue::from_json(base), HistoryValue::from_json(patch)) {
        (Some(b), Some(p)) => merge(b, p).into_json(),
        (Some(b), None) => b.into_json(),
        (None, Some(p)) => p.into_json(),
        (None, None) => Value::Null,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

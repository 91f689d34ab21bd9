//! Row identifiers, group keys and row records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque identifier: a row id or a group key.
///
/// Hosts use either numbers or strings, so both are accepted and kept
/// distinct (`Key::Int(1)` is not `Key::Str("1")`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Str(String),
}

/// Identifies a row within the loaded data set.
pub type RowId = Key;

/// Identifies a group at one level of the tree.
pub type GroupKey = Key;

/// A row record as returned by the host. Usually a JSON object.
pub type Row = serde_json::Value;

impl Key {
    /// Read a key out of a JSON value. Only numbers and strings qualify.
    /// Numbers that do not fit an `i64` (floats, large unsigned ids) keep
    /// their JSON text as a string key.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Key::Str(s.clone())),
            serde_json::Value::Number(n) => Some(match n.as_i64() {
                Some(n) => Key::Int(n),
                None => Key::Str(n.to_string()),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{}", n),
            Key::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

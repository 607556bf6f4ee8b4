//! Field values as they flow between the store, the template and the controls

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of field name to value
pub type FieldValues = BTreeMap<String, FieldValue>;

/// A single field value (JSON compatible)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl FieldValue {
    /// Null and the empty string count as "no value"
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Loose boolean view: accepts `true`/`false` and their string forms
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Text(s) if s == "true" => Some(true),
            FieldValue::Text(s) if s == "false" => Some(false),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text shown in the document for this value
    pub fn display(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }

    /// Equality used when matching radio entries against the current value.
    ///
    /// Exact matches always succeed. A boolean matches its string form and a
    /// number matches its decimal rendering.
    pub fn loosely_eq(&self, other: &FieldValue) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (FieldValue::Bool(_), FieldValue::Text(_)) | (FieldValue::Text(_), FieldValue::Bool(_)) => {
                matches!((self.as_bool(), other.as_bool()), (Some(a), Some(b)) if a == b)
            }
            (FieldValue::Number(n), FieldValue::Text(s)) | (FieldValue::Text(s), FieldValue::Number(n)) => {
                n.to_string() == *s
            }
            _ => false,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

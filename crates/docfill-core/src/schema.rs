//! Field schema and DOCX checkbox mappings
//!
//! The schema is an ordered JSON object. Declaration order matters: when two
//! fields claim the same bookmark, the first declared field wins and
//! [`Schema::validate`] reports the conflict.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::DocfillError;
use crate::value::{FieldValue, FieldValues};

/// Field schema supplied by the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", default = "default_schema_type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: IndexMap<String, FieldConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

fn default_schema_type() -> String {
    "object".to_string()
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            schema_type: default_schema_type(),
            properties: IndexMap::new(),
            required: Vec::new(),
        }
    }
}

/// Primitive kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    String,
    Boolean,
    Number,
    Integer,
}

/// Format tag of a string field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldFormat {
    Date,
    DateTime,
    Other(String),
}

impl From<String> for FieldFormat {
    fn from(value: String) -> Self {
        match value.as_str() {
            "date" => FieldFormat::Date,
            "date-time" => FieldFormat::DateTime,
            _ => FieldFormat::Other(value),
        }
    }
}

impl From<FieldFormat> for String {
    fn from(value: FieldFormat) -> Self {
        match value {
            FieldFormat::Date => "date".to_string(),
            FieldFormat::DateTime => "date-time".to_string(),
            FieldFormat::Other(s) => s,
        }
    }
}

/// Configuration of a single field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FieldFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docx_mapping: Option<DocxMapping>,
}

/// Which native input a date field uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    Date,
    DateTime,
}

impl DateKind {
    pub fn input_type(&self) -> &'static str {
        match self {
            DateKind::Date => "date",
            DateKind::DateTime => "datetime-local",
        }
    }
}

/// Control family chosen for an editable field, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind<'a> {
    Checkbox,
    Select(&'a [String]),
    Date(DateKind),
    TextArea,
}

impl FieldConfig {
    pub fn is_boolean(&self) -> bool {
        self.kind == FieldKind::Boolean
    }

    pub fn date_kind(&self) -> Option<DateKind> {
        match self.format {
            Some(FieldFormat::Date) => Some(DateKind::Date),
            Some(FieldFormat::DateTime) => Some(DateKind::DateTime),
            _ => None,
        }
    }

    /// boolean, then enumerated values, then date formats, then free text
    pub fn control_kind(&self) -> ControlKind<'_> {
        if self.is_boolean() {
            return ControlKind::Checkbox;
        }
        if let Some(options) = self.enum_values.as_deref() {
            return ControlKind::Select(options);
        }
        match self.date_kind() {
            Some(kind) => ControlKind::Date(kind),
            None => ControlKind::TextArea,
        }
    }

    /// Value a placeholder starts with before initial data is merged
    pub fn default_value(&self) -> FieldValue {
        if self.is_boolean() {
            FieldValue::Bool(false)
        } else {
            FieldValue::Text(String::new())
        }
    }

    /// Hint shown inside empty inputs
    pub fn placeholder_for(&self, field: &str) -> String {
        self.description.clone().unwrap_or_else(|| field.to_string())
    }
}

/// A radio entry: bookmark name and the field value it represents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioEntry {
    pub name: String,
    pub value: FieldValue,
}

/// How a field value maps onto form-field bookmarks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDocxMapping", into = "RawDocxMapping")]
pub enum DocxMapping {
    CheckboxSingle { name: String },
    /// A yes/no pair. One half may be missing; the other still resolves.
    CheckboxDual {
        true_name: Option<String>,
        false_name: Option<String>,
    },
    Radio { entries: Vec<RadioEntry> },
    /// Plain text mapping; carries no bookmark semantics
    Text,
    /// Kept so the schema still loads; never matches a bookmark
    Malformed { raw: RawDocxMapping, reason: String },
}

/// Wire form of a mapping as written in schema JSON
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawDocxMapping {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub false_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<Vec<RadioEntry>>,
}

impl From<RawDocxMapping> for DocxMapping {
    fn from(raw: RawDocxMapping) -> Self {
        let reason = match raw.kind.as_str() {
            "checkbox" => match (&raw.name, &raw.true_name, &raw.false_name) {
                (_, None, None) => match &raw.name {
                    Some(n) => return DocxMapping::CheckboxSingle { name: n.clone() },
                    None => "checkbox mapping needs `name`, `true_name` or `false_name`".to_string(),
                },
                (_, t, f) => {
                    return DocxMapping::CheckboxDual {
                        true_name: t.clone(),
                        false_name: f.clone(),
                    }
                }
            },
            "radio" => match &raw.mapping {
                Some(entries) if !entries.is_empty() => {
                    return DocxMapping::Radio {
                        entries: entries.clone(),
                    }
                }
                _ => "radio mapping needs a non-empty `mapping` list".to_string(),
            },
            "text" => return DocxMapping::Text,
            other => format!("unknown mapping type `{}`", other),
        };
        DocxMapping::Malformed { raw, reason }
    }
}

impl From<DocxMapping> for RawDocxMapping {
    fn from(mapping: DocxMapping) -> Self {
        match mapping {
            DocxMapping::CheckboxSingle { name } => RawDocxMapping {
                kind: "checkbox".to_string(),
                name: Some(name),
                ..Default::default()
            },
            DocxMapping::CheckboxDual {
                true_name,
                false_name,
            } => RawDocxMapping {
                kind: "checkbox".to_string(),
                true_name,
                false_name,
                ..Default::default()
            },
            DocxMapping::Radio { entries } => RawDocxMapping {
                kind: "radio".to_string(),
                mapping: Some(entries),
                ..Default::default()
            },
            DocxMapping::Text => RawDocxMapping {
                kind: "text".to_string(),
                ..Default::default()
            },
            DocxMapping::Malformed { raw, .. } => raw,
        }
    }
}

impl DocxMapping {
    /// Role this mapping assigns to `bookmark`, if any
    fn side_of(&self, bookmark: &str) -> Option<BookmarkSide> {
        match self {
            DocxMapping::CheckboxSingle { name } if name == bookmark => Some(BookmarkSide::Single),
            DocxMapping::CheckboxDual {
                true_name,
                false_name,
            } => {
                if true_name.as_deref() == Some(bookmark) {
                    Some(if false_name.is_some() { BookmarkSide::True } else { BookmarkSide::Single })
                } else if false_name.as_deref() == Some(bookmark) {
                    Some(if true_name.is_some() { BookmarkSide::False } else { BookmarkSide::Negated })
                } else {
                    None
                }
            }
            DocxMapping::Radio { entries } => entries
                .iter()
                .find(|entry| entry.name == bookmark)
                .map(|entry| BookmarkSide::Radio(entry.value.clone())),
            _ => None,
        }
    }

    /// Every bookmark name this mapping refers to
    pub fn bookmark_names(&self) -> Vec<&str> {
        match self {
            DocxMapping::CheckboxSingle { name } => vec![name.as_str()],
            DocxMapping::CheckboxDual {
                true_name,
                false_name,
            } => true_name.iter().chain(false_name.iter()).map(|n| n.as_str()).collect(),
            DocxMapping::Radio { entries } => entries.iter().map(|e| e.name.as_str()).collect(),
            DocxMapping::Text | DocxMapping::Malformed { .. } => Vec::new(),
        }
    }
}

/// Which side of a mapping a bookmark stands for
#[derive(Debug, Clone, PartialEq)]
pub enum BookmarkSide {
    Single,
    True,
    False,
    /// A lone `false_name`: checked when the field is false
    Negated,
    Radio(FieldValue),
}

/// Resolved owner of a bookmark
#[derive(Debug, Clone, PartialEq)]
pub struct BookmarkRole {
    pub field: String,
    pub side: BookmarkSide,
}

impl BookmarkRole {
    /// Whether the bookmark is checked for the given field values
    pub fn is_checked(&self, values: &FieldValues) -> bool {
        let current = values.get(&self.field);
        match &self.side {
            BookmarkSide::Single | BookmarkSide::True => {
                current.and_then(FieldValue::as_bool) == Some(true)
            }
            BookmarkSide::False | BookmarkSide::Negated => current.and_then(FieldValue::as_bool) == Some(false),
            BookmarkSide::Radio(expected) => current.is_some_and(|v| v.loosely_eq(expected)),
        }
    }

    /// Field value implied by toggling this bookmark.
    ///
    /// Unchecking a radio entry implies nothing; the group keeps its value.
    pub fn value_for(&self, checked: bool) -> Option<FieldValue> {
        match &self.side {
            BookmarkSide::Single | BookmarkSide::True => Some(FieldValue::Bool(checked)),
            BookmarkSide::False | BookmarkSide::Negated => Some(FieldValue::Bool(!checked)),
            BookmarkSide::Radio(value) if checked => Some(value.clone()),
            BookmarkSide::Radio(_) => None,
        }
    }

    /// Paired dual and radio bookmarks render as one radio group per field
    pub fn is_exclusive(&self) -> bool {
        matches!(self.side, BookmarkSide::True | BookmarkSide::False | BookmarkSide::Radio(_))
    }

    /// `value` attribute of the radio input for this bookmark
    pub fn radio_value(&self) -> String {
        match &self.side {
            BookmarkSide::Single | BookmarkSide::True => "true".to_string(),
            BookmarkSide::False | BookmarkSide::Negated => "false".to_string(),
            BookmarkSide::Radio(value) => value.display(),
        }
    }

    pub fn radio_group(&self) -> String {
        format!("radio-group-{}", self.field)
    }
}

/// Problems found while validating a schema. None of them are fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaIssue {
    DuplicateBookmark {
        bookmark: String,
        kept: String,
        ignored: String,
    },
    MalformedMapping {
        field: String,
        reason: String,
    },
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaIssue::DuplicateBookmark {
                bookmark,
                kept,
                ignored,
            } => write!(
                f,
                "bookmark `{}` is mapped by `{}` and `{}`; `{}` wins",
                bookmark, kept, ignored, kept
            ),
            SchemaIssue::MalformedMapping { field, reason } => {
                write!(f, "field `{}`: {}", field, reason)
            }
        }
    }
}

impl Schema {
    pub fn from_json(json: &str) -> Result<Self, DocfillError> {
        serde_json::from_str(json).map_err(|e| DocfillError::Schema(e.to_string()))
    }

    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.properties.get(name)
    }

    /// First declared field whose mapping names `bookmark`
    pub fn bookmark_role(&self, bookmark: &str) -> Option<BookmarkRole> {
        self.properties.iter().find_map(|(field, config)| {
            let side = config.docx_mapping.as_ref()?.side_of(bookmark)?;
            Some(BookmarkRole {
                field: field.clone(),
                side,
            })
        })
    }

    /// Bookmark index built once, first declaration wins
    pub fn bookmark_roles(&self) -> HashMap<String, BookmarkRole> {
        let mut roles = HashMap::new();
        for (field, config) in &self.properties {
            let Some(mapping) = &config.docx_mapping else {
                continue;
            };
            for name in mapping.bookmark_names() {
                if roles.contains_key(name) {
                    continue;
                }
                if let Some(side) = mapping.side_of(name) {
                    roles.insert(
                        name.to_string(),
                        BookmarkRole {
                            field: field.clone(),
                            side,
                        },
                    );
                }
            }
        }
        roles
    }

    pub fn validate(&self) -> Vec<SchemaIssue> {
        let mut issues = Vec::new();
        let mut owners: HashMap<&str, &str> = HashMap::new();

        for (field, config) in &self.properties {
            let Some(mapping) = &config.docx_mapping else {
                continue;
            };
            if let DocxMapping::Malformed { reason, .. } = mapping {
                issues.push(SchemaIssue::MalformedMapping {
                    field: field.clone(),
                    reason: reason.clone(),
                });
                continue;
            }
            for name in mapping.bookmark_names() {
                match owners.get(name) {
                    Some(kept) if *kept != field.as_str() => {
                        issues.push(SchemaIssue::DuplicateBookmark {
                            bookmark: name.to_string(),
                            kept: kept.to_string(),
                            ignored: field.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        owners.insert(name, field.as_str());
                    }
                }
            }
        }

        issues
    }
}

//! Field-edit state tracking
//!
//! The store keeps the values captured at load next to the current ones.
//! A field is edited when its current value differs from the original;
//! `null`, a missing value and the empty string all count as "no value" and
//! compare equal to each other.

use serde::{Deserialize, Serialize};

use crate::error::BindError;
use crate::preview::PreviewDom;
use crate::value::{FieldValue, FieldValues};

pub const EDITED_CLASS: &str = "field-edited";
pub const ORIGINAL_CLASS: &str = "field-original";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditState {
    Original,
    Edited,
}

impl EditState {
    pub fn class_name(&self) -> &'static str {
        match self {
            EditState::Original => ORIGINAL_CLASS,
            EditState::Edited => EDITED_CLASS,
        }
    }

    pub fn opposite(&self) -> EditState {
        match self {
            EditState::Original => EditState::Edited,
            EditState::Edited => EditState::Original,
        }
    }
}

/// Current and original field values of one editor
#[derive(Debug, Clone, Default)]
pub struct FieldStore {
    current: FieldValues,
    original: FieldValues,
}

impl FieldStore {
    /// Start a store whose original snapshot equals `initial`
    pub fn new(initial: FieldValues) -> Self {
        Self {
            original: initial.clone(),
            current: initial,
        }
    }

    pub fn current(&self) -> &FieldValues {
        &self.current
    }

    pub fn original(&self) -> &FieldValues {
        &self.original
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.current.get(field)
    }

    pub fn set(&mut self, field: &str, value: FieldValue) {
        self.current.insert(field.to_string(), value);
    }

    /// Whether `value` differs from the value captured at load
    pub fn is_edited(&self, field: &str, value: &FieldValue) -> bool {
        match self.original.get(field) {
            Some(original) if original == value => false,
            Some(original) => !(original.is_empty() && value.is_empty()),
            None => !value.is_empty(),
        }
    }

    pub fn state_of(&self, field: &str) -> EditState {
        let value = self.current.get(field).cloned().unwrap_or_default();
        if self.is_edited(field, &value) {
            EditState::Edited
        } else {
            EditState::Original
        }
    }

    /// Names of all fields whose current value differs from the original
    pub fn edited_fields(&self) -> Vec<&str> {
        self.current
            .iter()
            .filter(|(field, value)| self.is_edited(field, value))
            .map(|(field, _)| field.as_str())
            .collect()
    }

    /// Apply the edit class of `field` to every control tagged with it
    pub fn recolor<D: PreviewDom>(&self, dom: &mut D, root: &D::Node, field: &str, value: &FieldValue) -> Result<usize, BindError> {
        let state = if self.is_edited(field, value) {
            EditState::Edited
        } else {
            EditState::Original
        };
        let nodes = dom.tagged(root, field);
        for node in &nodes {
            dom.set_edit_state(node, state)?;
        }
        Ok(nodes.len())
    }

    /// Recolor every field in the current store
    pub fn recolor_all<D: PreviewDom>(&self, dom: &mut D, root: &D::Node) -> Result<usize, BindError> {
        let mut touched = 0;
        for (field, value) in &self.current {
            touched += self.recolor(dom, root, field, value)?;
        }
        Ok(touched)
    }
}

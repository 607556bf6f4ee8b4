//! Marker-to-control binding

use std::collections::HashMap;

use super::{BoundControl, ChangeSource, Control, ControlBinding, Piece, PreviewDom};
use crate::marker::{self, FieldPath, MarkerMatch};
use crate::schema::{BookmarkRole, ControlKind, FieldConfig, Schema};
use crate::value::{FieldValue, FieldValues};

/// Minimum textarea height in pixels
pub const TEXTAREA_MIN_HEIGHT: u32 = 17;
/// Scroll height above which a single-line textarea grows
pub const TEXTAREA_GROW_THRESHOLD: u32 = 25;

/// Height of an auto-resizing textarea
pub fn textarea_height(value: &str, scroll_height: u32) -> u32 {
    if value.contains('\n') || scroll_height > TEXTAREA_GROW_THRESHOLD {
        scroll_height.max(TEXTAREA_MIN_HEIGHT)
    } else {
        TEXTAREA_MIN_HEIGHT
    }
}

/// A text node split around its markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    Marker(MarkerMatch),
}

/// Split `text` into plain runs and markers; empty runs are dropped
pub fn split_markers(text: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut last = 0;
    for found in marker::decode(text) {
        if found.span.start > last {
            fragments.push(Fragment::Text(text[last..found.span.start].to_string()));
        }
        last = found.span.end;
        fragments.push(Fragment::Marker(found));
    }
    if last < text.len() {
        fragments.push(Fragment::Text(text[last..].to_string()));
    }
    fragments
}

/// Outcome of one binding pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindReport {
    /// Text nodes that held at least one marker
    pub text_nodes: usize,
    pub controls: usize,
    /// Text nodes the DOM refused to rewrite
    pub failed: usize,
}

/// Replaces markers in a rendered preview with controls
pub struct PreviewBinder<'a> {
    schema: &'a Schema,
    values: &'a FieldValues,
    readonly: bool,
    roles: HashMap<String, BookmarkRole>,
}

impl<'a> PreviewBinder<'a> {
    pub fn new(schema: &'a Schema, values: &'a FieldValues, readonly: bool) -> Self {
        Self {
            schema,
            values,
            readonly,
            roles: schema.bookmark_roles(),
        }
    }

    /// Visit every text node under `root` once and swap its markers for controls
    pub fn bind<D: PreviewDom>(&self, dom: &mut D, root: &D::Node) -> BindReport {
        let mut report = BindReport::default();

        for node in dom.text_nodes(root) {
            let text = dom.text(&node);
            if !marker::contains_marker(&text) {
                continue;
            }

            let mut controls = 0;
            let pieces: Vec<Piece> = split_markers(&text)
                .into_iter()
                .map(|fragment| match fragment {
                    Fragment::Text(text) => Piece::Text(text),
                    Fragment::Marker(found) => {
                        controls += 1;
                        Piece::Control(self.control_for(&found))
                    }
                })
                .collect();

            match dom.replace_with(&node, pieces) {
                Ok(()) => {
                    report.text_nodes += 1;
                    report.controls += controls;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Could not bind markers in text node");
                    report.failed += 1;
                }
            }
        }

        tracing::debug!(
            text_nodes = report.text_nodes,
            controls = report.controls,
            failed = report.failed,
            "Bound preview"
        );
        report
    }

    pub fn control_for(&self, found: &MarkerMatch) -> BoundControl {
        match &found.field_path {
            FieldPath::Checkbox(bookmark) => self.checkbox_control(bookmark, &found.payload, &found.field_path),
            FieldPath::Field(field) => self.field_control(field, found),
        }
    }

    fn checkbox_control(&self, bookmark: &str, payload: &str, path: &FieldPath) -> BoundControl {
        let role = self.roles.get(bookmark);
        let checked = payload == marker::CHECKED_GLYPH;

        let control = match role {
            _ if self.readonly => Control::ReadonlyGlyph {
                glyph: marker::glyph(checked).to_string(),
            },
            Some(role) if role.is_exclusive() => Control::Radio {
                group: role.radio_group(),
                value: role.radio_value(),
                checked,
            },
            _ => Control::Checkbox { checked },
        };

        BoundControl {
            control,
            binding: ControlBinding {
                tag: path.to_string(),
                owner: Some(role.map_or_else(|| bookmark.to_string(), |r| r.field.clone())),
                source: ChangeSource::Checkbox(bookmark.to_string()),
            },
        }
    }

    fn field_control(&self, field: &str, found: &MarkerMatch) -> BoundControl {
        let default_config = FieldConfig::default();
        let config = self.schema.field(field).unwrap_or(&default_config);
        let stored = self.values.get(field);

        let display = if found.is_blank() {
            stored.map(FieldValue::display).unwrap_or_default()
        } else {
            found.payload.clone()
        };
        let stored_true = stored.and_then(FieldValue::as_bool) == Some(true);

        let control = if self.readonly {
            if config.is_boolean() {
                Control::ReadonlyGlyph {
                    glyph: marker::glyph(display == "true" || stored_true).to_string(),
                }
            } else {
                Control::ReadonlyText {
                    text: marker::restore_newlines(&display),
                }
            }
        } else {
            match config.control_kind() {
                ControlKind::Checkbox => Control::Checkbox {
                    checked: display == "true" || stored_true,
                },
                ControlKind::Select(options) => Control::Select {
                    options: options.to_vec(),
                    selected: options
                        .iter()
                        .find(|option| {
                            display == **option || stored.and_then(FieldValue::as_str) == Some(option.as_str())
                        })
                        .cloned(),
                },
                ControlKind::Date(kind) => Control::DateInput {
                    kind,
                    value: display,
                    placeholder: config.placeholder_for(field),
                },
                ControlKind::TextArea => Control::TextArea {
                    value: marker::restore_newlines(&display),
                    placeholder: config.placeholder_for(field),
                },
            }
        };

        BoundControl {
            control,
            binding: ControlBinding {
                tag: field.to_string(),
                owner: None,
                source: ChangeSource::Field(field.to_string()),
            },
        }
    }
}

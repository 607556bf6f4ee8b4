//! Live preview binding
//!
//! A preview is produced by an external renderer from a preview-mode
//! document. Its text still contains markers; the [`binder`] walks the text
//! nodes, splits each one around its markers and asks the [`PreviewDom`] to
//! insert a control for every marker.
//!
//! The DOM is abstract so the same binding logic runs against the browser
//! (`web-sys`) and against the in-memory [`tree::PreviewTree`].

pub mod binder;
pub mod render;
pub mod tree;

use crate::error::{BindError, DocfillError};
use crate::schema::DateKind;
use crate::tracker::EditState;

pub use binder::{split_markers, textarea_height, BindReport, Fragment, PreviewBinder};
pub use render::DocxTextPreview;
pub use tree::{NodeId, PreviewTree};

/// Attribute carrying a control's field path (`name` or `checkbox:Check1`)
pub const FIELD_PATH_ATTR: &str = "data-field-path";
/// Attribute carrying the schema field that owns a checkbox control
pub const FIELD_OWNER_ATTR: &str = "data-field-owner";
/// Marks a control container so rebinding skips its text
pub const BOUND_ATTR: &str = "data-docfill-bound";

pub const CONTAINER_CLASS: &str = "inline-field-container";
pub const SELECT_PLACEHOLDER: &str = "Select...";

/// Document tree the binder can rewrite
pub trait PreviewDom {
    type Node: Clone;

    /// Text nodes under `root` in document order, skipping bound containers
    fn text_nodes(&self, root: &Self::Node) -> Vec<Self::Node>;

    fn text(&self, node: &Self::Node) -> String;

    /// Replace a text node with a sequence of text and controls
    fn replace_with(&mut self, node: &Self::Node, pieces: Vec<Piece>) -> Result<(), BindError>;

    /// Control elements whose field path or owner equals `identity`
    fn tagged(&self, root: &Self::Node, identity: &str) -> Vec<Self::Node>;

    fn set_edit_state(&mut self, node: &Self::Node, state: EditState) -> Result<(), BindError>;

    /// Remove everything under `root`
    fn clear(&mut self, root: &Self::Node);
}

/// Turns preview-mode document bytes into preview markup under `root`
pub trait PreviewRenderer {
    type Dom: PreviewDom;

    fn render(
        &mut self,
        document: &[u8],
        dom: &mut Self::Dom,
        root: &<Self::Dom as PreviewDom>::Node,
    ) -> Result<(), DocfillError>;
}

/// One piece of a split text node
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Text(String),
    Control(BoundControl),
}

/// Inline control chosen for a marker
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    ReadonlyGlyph { glyph: String },
    ReadonlyText { text: String },
    Checkbox { checked: bool },
    Radio { group: String, value: String, checked: bool },
    Select { options: Vec<String>, selected: Option<String> },
    DateInput { kind: DateKind, value: String, placeholder: String },
    TextArea { value: String, placeholder: String },
}

impl Control {
    pub fn css_class(&self) -> &'static str {
        match self {
            Control::ReadonlyGlyph { .. } => "inline-checkbox-readonly",
            Control::ReadonlyText { .. } => "inline-field-readonly",
            Control::Checkbox { .. } => "inline-checkbox",
            Control::Radio { .. } => "inline-radio-container",
            Control::Select { .. } => "inline-select",
            Control::DateInput { .. } => "inline-date-input",
            Control::TextArea { .. } => "inline-textarea",
        }
    }

    pub fn is_interactive(&self) -> bool {
        !matches!(self, Control::ReadonlyGlyph { .. } | Control::ReadonlyText { .. })
    }
}

/// Where a control's edits go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSource {
    Field(String),
    Checkbox(String),
}

/// Identity of a control inside the preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlBinding {
    /// Value of the field-path attribute
    pub tag: String,
    /// Field that owns a checkbox bookmark
    pub owner: Option<String>,
    pub source: ChangeSource,
}

/// A control and the binding its events report through
#[derive(Debug, Clone, PartialEq)]
pub struct BoundControl {
    pub control: Control,
    pub binding: ControlBinding,
}

/// Raw input reported by a control
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeInput {
    Checked(bool),
    Value(String),
}

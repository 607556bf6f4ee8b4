//! docfill-core: inline field editing for DOCX templates
//!
//! Templates are ordinary Word documents with `{field}` tags and legacy
//! form-field checkboxes. This crate:
//! - reads and writes the DOCX container ([`package`])
//! - renders templates in preview or final mode ([`template`], [`checkbox`])
//! - tags preview values with inline markers ([`marker`])
//! - turns markers in a rendered preview into bound controls ([`preview`])
//! - tracks which fields were edited ([`tracker`])
//! - ties it together per open editor ([`session`])

pub mod checkbox;
pub mod error;
pub mod marker;
pub mod package;
pub mod preview;
pub mod schema;
pub mod session;
pub mod source;
pub mod template;
pub mod tracker;
pub mod value;

mod wordml;

pub use checkbox::CheckboxResolver;
pub use error::{BindError, DocfillError, SourceError};
pub use package::{DocxPackage, DOCX_MIME_TYPE};
pub use preview::{
    BindReport, BoundControl, ChangeInput, ChangeSource, Control, ControlBinding, DocxTextPreview, Piece,
    PreviewBinder, PreviewDom, PreviewRenderer, PreviewTree,
};
pub use schema::{DocxMapping, FieldConfig, FieldKind, Schema, SchemaIssue};
pub use session::{BindOutcome, EditorSession, RenderTicket, SessionOptions, SessionState};
pub use source::{FsSource, MemorySource, TemplateSource};
pub use template::{compute_defaults, extract_placeholders, render, render_bytes, RenderMode};
pub use tracker::{EditState, FieldStore};
pub use value::{FieldValue, FieldValues};

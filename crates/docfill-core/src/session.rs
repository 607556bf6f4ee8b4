//! Editor session
//!
//! One [`EditorSession`] per open editor. It owns the template, the field
//! store and the render bookkeeping, and drives the load, render, bind and
//! save cycle:
//!
//! 1. [`EditorSession::load_from`] (or [`EditorSession::load_bytes`]) reads
//!    the template, extracts its placeholders and seeds the store.
//! 2. [`EditorSession::begin_render`] produces a preview-mode document and a
//!    render token.
//! 3. Once the external renderer has finished, [`EditorSession::bind_preview`]
//!    swaps markers for controls, unless a newer render has started or the
//!    session was closed in the meantime.
//! 4. Control events come back through [`EditorSession::apply_change`].
//! 5. [`EditorSession::save`] publishes the snapshot; [`EditorSession::export`]
//!    produces the final document.

use serde::{Deserialize, Serialize};

use crate::error::DocfillError;
use crate::package::DocxPackage;
use crate::preview::{BindReport, ChangeInput, ChangeSource, ControlBinding, PreviewBinder, PreviewDom, PreviewRenderer};
use crate::schema::Schema;
use crate::source::TemplateSource;
use crate::template::{self, RenderMode};
use crate::tracker::FieldStore;
use crate::value::{FieldValue, FieldValues};

/// Host-supplied editor options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Render static text instead of controls and never report changes
    pub readonly: bool,
    /// Report the full snapshot on every edit, not only on save
    pub emit_on_change: bool,
    /// Delay before binding when the renderer gives no completion signal
    pub bind_delay_ms: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            readonly: false,
            emit_on_change: true,
            bind_delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    Loading,
    Ready,
    LoadFailed { message: String },
    RenderFailed { message: String },
    Closed,
}

/// A preview-mode document and the token identifying its render
#[derive(Debug, Clone)]
pub struct RenderTicket {
    pub token: u64,
    pub document: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    Bound(BindReport),
    /// A newer render started before this one was bound
    Stale,
    Closed,
}

pub type ChangeCallback = Box<dyn FnMut(&FieldValues)>;

pub struct EditorSession {
    schema: Schema,
    options: SessionOptions,
    initial: FieldValues,
    template: Option<DocxPackage>,
    placeholders: Vec<String>,
    store: FieldStore,
    state: SessionState,
    save_count: u64,
    render_token: u64,
    on_change: Option<ChangeCallback>,
}

impl EditorSession {
    pub fn new(schema: Schema, initial: FieldValues, options: SessionOptions) -> Self {
        for issue in schema.validate() {
            tracing::warn!(%issue, "Schema issue");
        }

        Self {
            schema,
            options,
            initial,
            template: None,
            placeholders: Vec::new(),
            store: FieldStore::default(),
            state: SessionState::Loading,
            save_count: 0,
            render_token: 0,
            on_change: None,
        }
    }

    pub fn set_change_callback(&mut self, callback: impl FnMut(&FieldValues) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    pub fn values(&self) -> &FieldValues {
        self.store.current()
    }

    pub fn save_count(&self) -> u64 {
        self.save_count
    }

    pub fn is_alive(&self) -> bool {
        self.state != SessionState::Closed
    }

    /// Fetch the template from `source` and load it
    pub async fn load_from<S>(&mut self, source: &S, location: &str) -> Result<(), DocfillError>
    where
        S: TemplateSource + ?Sized,
    {
        tracing::info!(location, "Loading template");
        let fetched = source.fetch(location).await;
        if !self.is_alive() {
            return Err(DocfillError::Closed);
        }
        match fetched {
            Ok(bytes) => self.load_bytes(&bytes),
            Err(e) => Err(self.fail_load(e.into())),
        }
    }

    /// Load a template that is already in memory
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), DocfillError> {
        if !self.is_alive() {
            return Err(DocfillError::Closed);
        }
        self.state = SessionState::Loading;

        let package = match DocxPackage::from_bytes(bytes) {
            Ok(package) => package,
            Err(e) => return Err(self.fail_load(e)),
        };
        let text = match package.full_text() {
            Ok(text) => text,
            Err(e) => return Err(self.fail_load(e)),
        };

        let placeholders = template::extract_placeholders(&text);
        let mut merged = template::compute_defaults(&placeholders, Some(&self.schema));
        merged.extend(self.initial.clone());

        tracing::info!(
            placeholders = placeholders.len(),
            fields = merged.len(),
            "Template loaded"
        );

        self.store = FieldStore::new(merged);
        self.placeholders = placeholders;
        self.template = Some(package);
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Record a load failure, including one raised outside the session
    /// (a fetch the host performed itself)
    pub fn fail_load(&mut self, error: DocfillError) -> DocfillError {
        let message = format!("Failed to load document: {}", error);
        tracing::warn!(%message);
        self.state = SessionState::LoadFailed { message };
        error
    }

    /// Record a render failure and return the error unchanged
    pub fn fail_render(&mut self, error: DocfillError) -> DocfillError {
        let message = format!("Error updating preview: {}", error);
        tracing::warn!(%message);
        self.state = SessionState::RenderFailed { message };
        error
    }

    /// Render the preview document for the current values.
    ///
    /// Every call supersedes earlier tickets, including failed ones.
    pub fn begin_render(&mut self) -> Result<RenderTicket, DocfillError> {
        if !self.is_alive() {
            return Err(DocfillError::Closed);
        }
        self.render_token += 1;
        let token = self.render_token;

        let rendered = match &self.template {
            Some(package) => template::render(package, self.store.current(), Some(&self.schema), RenderMode::Preview)
                .and_then(|doc| doc.to_bytes()),
            None => Err(DocfillError::NotLoaded),
        };

        match rendered {
            Ok(document) => {
                tracing::debug!(token, bytes = document.len(), "Preview rendered");
                self.state = SessionState::Ready;
                Ok(RenderTicket { token, document })
            }
            Err(e) => Err(self.fail_render(e)),
        }
    }

    /// Whether `token` belongs to the latest render of a live session
    pub fn is_current(&self, token: u64) -> bool {
        self.is_alive() && token == self.render_token
    }

    /// Replace markers under `root` with controls and apply edit colors
    pub fn bind_preview<D: PreviewDom>(&mut self, token: u64, dom: &mut D, root: &D::Node) -> Result<BindOutcome, DocfillError> {
        if !self.is_alive() {
            return Ok(BindOutcome::Closed);
        }
        if token != self.render_token {
            tracing::debug!(token, latest = self.render_token, "Skipping stale bind");
            return Ok(BindOutcome::Stale);
        }

        let binder = PreviewBinder::new(&self.schema, self.store.current(), self.options.readonly);
        let report = binder.bind(dom, root);
        self.store.recolor_all(dom, root)?;
        Ok(BindOutcome::Bound(report))
    }

    /// Render, hand the document to `renderer` and bind, all in one go
    pub fn render_preview<R: PreviewRenderer>(
        &mut self,
        renderer: &mut R,
        dom: &mut R::Dom,
        root: &<R::Dom as PreviewDom>::Node,
    ) -> Result<BindOutcome, DocfillError> {
        let ticket = self.begin_render()?;
        if let Err(e) = renderer.render(&ticket.document, dom, root) {
            return Err(self.fail_render(e));
        }
        self.bind_preview(ticket.token, dom, root)
    }

    /// Apply an edit reported by a bound control
    pub fn apply_change<D: PreviewDom>(
        &mut self,
        dom: &mut D,
        root: &D::Node,
        binding: &ControlBinding,
        input: ChangeInput,
    ) -> Result<(), DocfillError> {
        if self.options.readonly || !self.is_alive() {
            return Ok(());
        }

        let changed = match (&binding.source, input) {
            (ChangeSource::Field(field), ChangeInput::Checked(checked)) => {
                self.set_field(field, FieldValue::Bool(checked));
                Some(field.clone())
            }
            (ChangeSource::Field(field), ChangeInput::Value(value)) => {
                self.set_field(field, FieldValue::Text(value));
                Some(field.clone())
            }
            (ChangeSource::Checkbox(bookmark), ChangeInput::Checked(checked)) => self.set_checkbox(bookmark, checked),
            (ChangeSource::Checkbox(bookmark), ChangeInput::Value(value)) => self.set_checkbox(bookmark, value == "true"),
        };

        if let Some(field) = changed {
            let value = self.store.get(&field).cloned().unwrap_or_default();
            self.store.recolor(dom, root, &field, &value)?;
        }
        Ok(())
    }

    /// Write a field value and notify the host
    pub fn set_field(&mut self, field: &str, value: FieldValue) {
        if self.options.readonly || !self.is_alive() {
            return;
        }
        tracing::debug!(field, ?value, "Field changed");
        self.store.set(field, value);
        if self.options.emit_on_change {
            self.emit();
        }
    }

    /// Toggle a checkbox bookmark; returns the field that changed, if any
    pub fn set_checkbox(&mut self, bookmark: &str, checked: bool) -> Option<String> {
        match self.schema.bookmark_role(bookmark) {
            Some(role) => {
                let value = role.value_for(checked)?;
                self.set_field(&role.field, value);
                Some(role.field)
            }
            None => {
                self.set_field(bookmark, FieldValue::Bool(checked));
                Some(bookmark.to_string())
            }
        }
    }

    fn emit(&mut self) {
        if let Some(callback) = self.on_change.as_mut() {
            callback(self.store.current());
        }
    }

    /// Publish the current snapshot. The host re-renders afterwards.
    pub fn save(&mut self) -> Result<FieldValues, DocfillError> {
        if !self.is_alive() {
            return Err(DocfillError::Closed);
        }
        if !self.options.readonly {
            self.emit();
        }
        self.save_count += 1;
        tracing::info!(save = self.save_count, edited = self.store.edited_fields().len(), "Saved");
        Ok(self.store.current().clone())
    }

    /// Final document with the current values merged in
    pub fn export(&self) -> Result<Vec<u8>, DocfillError> {
        let package = self.template.as_ref().ok_or(DocfillError::NotLoaded)?;
        template::render(package, self.store.current(), Some(&self.schema), RenderMode::Final)?.to_bytes()
    }

    /// Tear down; later renders and binds become no-ops
    pub fn close(&mut self) {
        if self.is_alive() {
            tracing::info!("Session closed");
        }
        self.state = SessionState::Closed;
        self.on_change = None;
    }
}

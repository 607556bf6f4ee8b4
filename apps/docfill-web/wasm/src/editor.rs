//! `DocumentEditor`: the browser-facing editor
//!
//! State lives in Rust. JavaScript supplies the container element, a preview
//! renderer (`(bytes, container) => Promise | undefined`) and optionally a
//! change callback; everything else goes through the session.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use docfill_core::{
    BindOutcome, ChangeInput, ControlBinding, DocfillError, EditorSession, FieldValues, PreviewDom, Schema,
    SessionOptions, SessionState, TemplateSource,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::{Element, Node};

use crate::dom::{ChangeHandler, WebDom};
use crate::source::FetchSource;

pub const ERROR_CLASS: &str = "docfill-error";

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn js_error(err: DocfillError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn js_message(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}

/// Resolve after `ms` milliseconds
async fn sleep(ms: u32) -> Result<(), JsValue> {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let scheduled = web_sys::window().map(|window| {
            window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms as i32)
        });
        if !matches!(scheduled, Some(Ok(_))) {
            let _ = resolve.call0(&JsValue::NULL);
        }
    });
    JsFuture::from(promise).await.map(|_| ())
}

/// Shared editor state. Event listeners hold a `Weak` to it.
struct Editor {
    session: RefCell<EditorSession>,
    dom: RefCell<WebDom>,
    root: Node,
    renderer: RefCell<Option<js_sys::Function>>,
    on_change: RefCell<Option<js_sys::Function>>,
    /// Latest snapshot reported by the session, delivered once no borrow is held
    pending: Rc<RefCell<Option<FieldValues>>>,
}

impl Editor {
    fn handle_change(&self, binding: ControlBinding, input: ChangeInput) {
        let result = {
            let mut session = self.session.borrow_mut();
            let mut dom = self.dom.borrow_mut();
            session.apply_change(&mut *dom, &self.root, &binding, input)
        };
        if let Err(e) = result {
            web_sys::console::warn_1(&format!("Edit of '{}' failed: {}", binding.tag, e).into());
        }
        self.flush_changes();
    }

    fn flush_changes(&self) {
        let Some(values) = self.pending.borrow_mut().take() else {
            return;
        };
        let Some(callback) = self.on_change.borrow().clone() else {
            return;
        };
        match to_js(&values) {
            Ok(snapshot) => {
                if let Err(e) = callback.call1(&JsValue::NULL, &snapshot) {
                    web_sys::console::error_1(&e);
                }
            }
            Err(e) => web_sys::console::error_1(&e),
        }
    }

    async fn load(&self, url: &str) -> Result<(), DocfillError> {
        web_sys::console::log_1(&format!("Loading template from {}", url).into());
        let fetched = FetchSource::new().fetch(url).await;

        let result = {
            let mut session = self.session.borrow_mut();
            if !session.is_alive() {
                return Err(DocfillError::Closed);
            }
            match fetched {
                Ok(bytes) => session.load_bytes(&bytes),
                Err(e) => Err(session.fail_load(e.into())),
            }
        };
        if result.is_err() {
            self.show_state_error();
        }
        result
    }

    /// Render the preview, wait for the renderer, then bind
    async fn render(&self) -> Result<BindOutcome, DocfillError> {
        let ticket = {
            let mut session = self.session.borrow_mut();
            session.begin_render()
        };
        let ticket = match ticket {
            Ok(ticket) => ticket,
            Err(DocfillError::Closed) => return Ok(BindOutcome::Closed),
            Err(e) => {
                self.show_state_error();
                return Err(e);
            }
        };

        self.dom.borrow_mut().clear(&self.root);

        if let Err(e) = self.run_renderer(&ticket.document).await {
            let error = self
                .session
                .borrow_mut()
                .fail_render(DocfillError::Renderer(js_message(&e)));
            self.show_state_error();
            return Err(error);
        }

        let outcome = {
            let mut session = self.session.borrow_mut();
            let mut dom = self.dom.borrow_mut();
            session.bind_preview(ticket.token, &mut *dom, &self.root)
        };
        if let Ok(BindOutcome::Bound(report)) = &outcome {
            web_sys::console::log_1(
                &format!(
                    "Bound {} controls in {} text nodes ({} failed)",
                    report.controls, report.text_nodes, report.failed
                )
                .into(),
            );
        }
        outcome
    }

    async fn run_renderer(&self, document: &[u8]) -> Result<(), JsValue> {
        let renderer = self
            .renderer
            .borrow()
            .clone()
            .ok_or_else(|| JsValue::from_str("No preview renderer registered"))?;

        let bytes = js_sys::Uint8Array::new_with_length(document.len() as u32);
        bytes.copy_from(document);

        let returned = renderer.call2(&JsValue::NULL, &bytes, &self.root)?;
        match returned.dyn_into::<js_sys::Promise>() {
            Ok(promise) => JsFuture::from(promise).await.map(|_| ()),
            Err(_) => {
                let delay = self.session.borrow().options().bind_delay_ms;
                sleep(delay).await
            }
        }
    }

    /// Replace the container content with the session's failure message
    fn show_state_error(&self) {
        let message = match self.session.borrow().state() {
            SessionState::LoadFailed { message } | SessionState::RenderFailed { message } => message.clone(),
            _ => return,
        };
        web_sys::console::error_1(&message.clone().into());

        self.dom.borrow_mut().clear(&self.root);
        let document = self.dom.borrow().document().clone();
        if let Ok(panel) = document.create_element("div") {
            panel.set_class_name(ERROR_CLASS);
            panel.set_text_content(Some(&message));
            let _ = self.root.append_child(&panel);
        }
    }

    fn save(self: &Rc<Self>) -> Result<JsValue, JsValue> {
        let snapshot = self.session.borrow_mut().save().map_err(js_error)?;
        self.flush_changes();

        let editor = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = editor.render().await {
                web_sys::console::warn_1(&format!("Re-render after save failed: {}", e).into());
            }
        });
        to_js(&snapshot)
    }
}

/// Inline field editor bound to one container element
#[wasm_bindgen]
pub struct DocumentEditor {
    inner: Rc<Editor>,
}

#[wasm_bindgen]
impl DocumentEditor {
    /// Create an editor.
    ///
    /// `schema` is the JSON schema text; `values` and `options` are plain
    /// objects and may be `undefined`.
    #[wasm_bindgen(constructor)]
    pub fn new(container: Element, schema: &str, values: JsValue, options: JsValue) -> Result<DocumentEditor, JsValue> {
        let schema =
            Schema::from_json(schema).map_err(|e| JsValue::from_str(&format!("Invalid schema: {}", e)))?;
        let values: FieldValues = if values.is_undefined() || values.is_null() {
            FieldValues::new()
        } else {
            serde_wasm_bindgen::from_value(values).map_err(|e| JsValue::from_str(&format!("Invalid values: {}", e)))?
        };
        let options: SessionOptions = if options.is_undefined() || options.is_null() {
            SessionOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)
                .map_err(|e| JsValue::from_str(&format!("Invalid options: {}", e)))?
        };
        let document = container
            .owner_document()
            .ok_or_else(|| JsValue::from_str("Container is not attached to a document"))?;

        let pending: Rc<RefCell<Option<FieldValues>>> = Rc::default();
        let mut session = EditorSession::new(schema, values, options);
        let sink = pending.clone();
        session.set_change_callback(move |values| {
            *sink.borrow_mut() = Some(values.clone());
        });

        let inner = Rc::new_cyclic(|weak: &Weak<Editor>| {
            let weak = weak.clone();
            let handler: ChangeHandler = Rc::new(move |binding, input| {
                if let Some(editor) = weak.upgrade() {
                    editor.handle_change(binding, input);
                }
            });
            Editor {
                session: RefCell::new(session),
                dom: RefCell::new(WebDom::new(document, Some(handler))),
                root: container.into(),
                renderer: RefCell::new(None),
                on_change: RefCell::new(None),
                pending,
            }
        });

        Ok(DocumentEditor { inner })
    }

    /// Register the preview renderer: `(bytes: Uint8Array, container) => Promise | undefined`
    #[wasm_bindgen(js_name = setRenderer)]
    pub fn set_renderer(&self, renderer: js_sys::Function) {
        *self.inner.renderer.borrow_mut() = Some(renderer);
    }

    /// Register the change callback, called with the full value snapshot
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: js_sys::Function) {
        *self.inner.on_change.borrow_mut() = Some(callback);
    }

    /// Fetch the template at `url`, then render and bind the preview
    pub fn load(&self, url: String) -> js_sys::Promise {
        let editor = self.inner.clone();
        future_to_promise(async move {
            editor.load(&url).await.map_err(js_error)?;
            editor.render().await.map_err(js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Load a template already in memory, then render and bind
    #[wasm_bindgen(js_name = loadBytes)]
    pub fn load_bytes(&self, bytes: &[u8]) -> js_sys::Promise {
        let loaded = self.inner.session.borrow_mut().load_bytes(bytes);
        if let Err(e) = loaded {
            self.inner.show_state_error();
            return js_sys::Promise::reject(&js_error(e));
        }
        self.refresh()
    }

    /// Re-render the preview with the current values
    pub fn refresh(&self) -> js_sys::Promise {
        let editor = self.inner.clone();
        future_to_promise(async move {
            let outcome = editor.render().await.map_err(js_error)?;
            Ok(JsValue::from_bool(matches!(outcome, BindOutcome::Bound(_))))
        })
    }

    /// Publish the current values and re-render. Returns the snapshot.
    pub fn save(&self) -> Result<JsValue, JsValue> {
        self.inner.save()
    }

    /// A function the host can call to save, usable after this object is
    /// out of reach. It does nothing once the editor is dropped.
    #[wasm_bindgen(js_name = saveHandle)]
    pub fn save_handle(&self) -> js_sys::Function {
        let weak = Rc::downgrade(&self.inner);
        let closure = Closure::wrap(Box::new(move || -> Result<JsValue, JsValue> {
            match weak.upgrade() {
                Some(editor) => editor.save(),
                None => Ok(JsValue::UNDEFINED),
            }
        }) as Box<dyn FnMut() -> Result<JsValue, JsValue>>);
        closure.into_js_value().unchecked_into()
    }

    /// Final document bytes with the current values merged in
    pub fn export(&self) -> Result<js_sys::Uint8Array, JsValue> {
        let bytes = self.inner.session.borrow().export().map_err(js_error)?;
        let array = js_sys::Uint8Array::new_with_length(bytes.len() as u32);
        array.copy_from(&bytes);
        Ok(array)
    }

    /// Current values as a plain object
    pub fn values(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.session.borrow().values())
    }

    /// Names of fields whose value differs from the initial one
    #[wasm_bindgen(js_name = editedFields)]
    pub fn edited_fields(&self) -> js_sys::Array {
        let session = self.inner.session.borrow();
        session
            .store()
            .edited_fields()
            .into_iter()
            .map(JsValue::from_str)
            .collect()
    }

    /// Placeholder names in first-occurrence order
    #[wasm_bindgen(getter)]
    pub fn placeholders(&self) -> js_sys::Array {
        self.inner
            .session
            .borrow()
            .placeholders()
            .iter()
            .map(|name| JsValue::from_str(name))
            .collect()
    }

    /// `{ status: "ready" | "loading" | ... , message? }`
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.session.borrow().state())
    }

    #[wasm_bindgen(getter, js_name = saveCount)]
    pub fn save_count(&self) -> f64 {
        self.inner.session.borrow().save_count() as f64
    }

    /// Stop the editor; pending renders and binds become no-ops
    pub fn close(&self) {
        self.inner.session.borrow_mut().close();
        self.inner.dom.borrow_mut().release_listeners();
        *self.inner.on_change.borrow_mut() = None;
        self.inner.pending.borrow_mut().take();
    }
}

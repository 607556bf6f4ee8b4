//! WASM bindings for inline DOCX field editing
//!
//! The editor keeps all state in Rust: template, field values, edit
//! tracking and render tokens. JavaScript renders the preview document
//! (for example with docx-preview) and wires up save and change handlers.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { DocumentEditor } from './pkg/docfill_wasm.js';
//! import { renderAsync } from 'docx-preview';
//!
//! await init();
//!
//! const editor = new DocumentEditor(container, schemaJson, { clientName: "Acme" }, { readonly: false });
//! editor.setRenderer((bytes, el) => renderAsync(bytes, el));
//! editor.onChange(values => console.log(values));
//! await editor.load("/templates/permit.docx");
//!
//! saveButton.onclick = editor.saveHandle();
//! downloadBlob(editor.export(), "permit.docx");
//! ```

pub mod dom;
pub mod editor;
pub mod source;

use wasm_bindgen::prelude::*;

pub use dom::WebDom;
pub use editor::DocumentEditor;
pub use source::FetchSource;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Placeholder names found in a DOCX template, in first-occurrence order
#[wasm_bindgen(js_name = extractPlaceholders)]
pub fn extract_placeholders(bytes: &[u8]) -> Result<js_sys::Array, JsValue> {
    let package =
        docfill_core::DocxPackage::from_bytes(bytes).map_err(|e| JsValue::from_str(&format!("Invalid document: {}", e)))?;
    let text = package
        .full_text()
        .map_err(|e| JsValue::from_str(&format!("Invalid document: {}", e)))?;
    Ok(docfill_core::extract_placeholders(&text)
        .iter()
        .map(|name| JsValue::from_str(name))
        .collect())
}

/// MIME type to use when offering an exported document for download
#[wasm_bindgen(js_name = docxMimeType)]
pub fn docx_mime_type() -> String {
    docfill_core::DOCX_MIME_TYPE.to_string()
}

//! Template fetching over the browser `fetch` API

use async_trait::async_trait;
use docfill_core::{SourceError, TemplateSource};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

/// Fetches templates by URL from the page's origin (or any CORS-enabled one)
#[derive(Debug, Clone, Default)]
pub struct FetchSource {
    cors: bool,
}

impl FetchSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send requests in CORS mode for templates served from another origin
    pub fn cors() -> Self {
        Self { cors: true }
    }
}

fn fetch_error(err: JsValue) -> SourceError {
    SourceError::Fetch(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
}

#[async_trait(?Send)]
impl TemplateSource for FetchSource {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, SourceError> {
        let window = web_sys::window().ok_or_else(|| SourceError::Fetch("No window".to_string()))?;

        let opts = RequestInit::new();
        opts.set_method("GET");
        if self.cors {
            opts.set_mode(RequestMode::Cors);
        }

        let request = Request::new_with_str_and_init(location, &opts).map_err(fetch_error)?;
        let response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(fetch_error)?;
        let response: Response = response.dyn_into().map_err(fetch_error)?;

        if response.status() == 404 {
            return Err(SourceError::NotFound(location.to_string()));
        }
        if !response.ok() {
            return Err(SourceError::Fetch(format!(
                "{} returned HTTP {}",
                location,
                response.status()
            )));
        }

        let buffer = JsFuture::from(response.array_buffer().map_err(fetch_error)?)
            .await
            .map_err(fetch_error)?;
        Ok(js_sys::Uint8Array::new(&buffer).to_vec())
    }
}

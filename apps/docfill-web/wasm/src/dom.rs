//! Browser DOM implementation of [`PreviewDom`]
//!
//! Controls are built as real form elements. Interactive ones get an event
//! listener that reports `(binding, input)` through the shared
//! [`ChangeHandler`]; the editor routes that into the session. Listeners are
//! owned by the [`WebDom`] and released on every `clear`.

use std::rc::Rc;

use docfill_core::preview::{
    textarea_height, BOUND_ATTR, CONTAINER_CLASS, FIELD_OWNER_ATTR, FIELD_PATH_ATTR, SELECT_PLACEHOLDER,
};
use docfill_core::{BindError, BoundControl, ChangeInput, Control, ControlBinding, EditState, Piece, PreviewDom};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, EventTarget, HtmlInputElement, HtmlOptionElement, HtmlSelectElement,
    HtmlTextAreaElement, Node,
};

/// `NodeFilter.SHOW_TEXT`
const SHOW_TEXT: u32 = 0x4;

/// Receives every edit made through a bound control
pub type ChangeHandler = Rc<dyn Fn(ControlBinding, ChangeInput)>;

fn dom_error(err: JsValue) -> BindError {
    BindError::Dom(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
}

/// Attribute selector value with quotes and backslashes escaped
fn selector_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A registered event listener, kept so it can be removed and freed
struct Listener {
    target: EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

pub struct WebDom {
    document: Document,
    on_change: Option<ChangeHandler>,
    listeners: Vec<Listener>,
}

impl WebDom {
    pub fn new(document: Document, on_change: Option<ChangeHandler>) -> Self {
        Self {
            document,
            on_change,
            listeners: Vec::new(),
        }
    }

    /// DOM for the current window's document
    pub fn from_window(on_change: Option<ChangeHandler>) -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("No document"))?;
        Ok(Self::new(document, on_change))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Listeners currently attached to bound controls
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Detach and free every control listener
    pub fn release_listeners(&mut self) {
        for listener in self.listeners.drain(..) {
            let _ = listener
                .target
                .remove_event_listener_with_callback(listener.event, listener.closure.as_ref().unchecked_ref());
        }
    }

    fn listen<F>(
        &mut self,
        target: &EventTarget,
        event: &'static str,
        binding: ControlBinding,
        read: F,
    ) -> Result<(), JsValue>
    where
        F: Fn() -> ChangeInput + 'static,
    {
        let Some(handler) = self.on_change.clone() else {
            return Ok(());
        };
        let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            handler(binding.clone(), read());
        }) as Box<dyn FnMut(_)>);
        target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        self.listeners.push(Listener {
            target: target.clone(),
            event,
            closure,
        });
        Ok(())
    }

    /// Build the container span and its control. Textareas are returned so
    /// they can be sized once attached.
    fn build_control(&mut self, bound: &BoundControl, textareas: &mut Vec<HtmlTextAreaElement>) -> Result<Element, JsValue> {
        let container = self.document.create_element("span")?;
        container.set_class_name(CONTAINER_CLASS);
        container.set_attribute(BOUND_ATTR, "true")?;

        let tag = match &bound.control {
            Control::ReadonlyGlyph { .. } | Control::ReadonlyText { .. } | Control::Radio { .. } => "span",
            Control::Checkbox { .. } | Control::DateInput { .. } => "input",
            Control::Select { .. } => "select",
            Control::TextArea { .. } => "textarea",
        };
        let element = self.document.create_element(tag)?;
        element.class_list().add_1(bound.control.css_class())?;
        element.set_attribute(FIELD_PATH_ATTR, &bound.binding.tag)?;
        if let Some(owner) = &bound.binding.owner {
            element.set_attribute(FIELD_OWNER_ATTR, owner)?;
        }

        let binding = bound.binding.clone();
        match &bound.control {
            Control::ReadonlyGlyph { glyph } => element.set_text_content(Some(glyph)),
            Control::ReadonlyText { text } => element.set_text_content(Some(text)),
            Control::Checkbox { checked } => {
                let input: HtmlInputElement = element.clone().dyn_into()?;
                input.set_type("checkbox");
                input.set_checked(*checked);
                let reader = input.clone();
                self.listen(&input, "change", binding, move || ChangeInput::Checked(reader.checked()))?;
            }
            Control::Radio { group, value, checked } => {
                let input: HtmlInputElement = self.document.create_element("input")?.dyn_into()?;
                input.set_type("radio");
                input.set_name(group);
                input.set_value(value);
                input.set_checked(*checked);
                element.append_child(&input)?;
                let reader = input.clone();
                self.listen(&input, "change", binding, move || ChangeInput::Checked(reader.checked()))?;
            }
            Control::Select { options, selected } => {
                let select: HtmlSelectElement = element.clone().dyn_into()?;
                select.append_child(&HtmlOptionElement::new_with_text_and_value(SELECT_PLACEHOLDER, "")?.into())?;
                for option in options {
                    select.append_child(&HtmlOptionElement::new_with_text_and_value(option, option)?.into())?;
                }
                select.set_value(selected.as_deref().unwrap_or(""));
                let reader = select.clone();
                self.listen(&select, "change", binding, move || ChangeInput::Value(reader.value()))?;
            }
            Control::DateInput { kind, value, placeholder } => {
                let input: HtmlInputElement = element.clone().dyn_into()?;
                input.set_type(kind.input_type());
                input.set_value(value);
                input.set_placeholder(placeholder);
                let reader = input.clone();
                self.listen(&input, "input", binding, move || ChangeInput::Value(reader.value()))?;
            }
            Control::TextArea { value, placeholder } => {
                let area: HtmlTextAreaElement = element.clone().dyn_into()?;
                area.set_rows(1);
                area.set_placeholder(placeholder);
                area.set_value(value);
                let reader = area.clone();
                self.listen(&area, "input", binding, move || {
                    resize_textarea(&reader);
                    ChangeInput::Value(reader.value())
                })?;
                textareas.push(area);
            }
        }

        container.append_child(&element)?;
        Ok(container)
    }
}

/// Grow a textarea to fit its content; single lines keep the minimum height
pub fn resize_textarea(area: &HtmlTextAreaElement) {
    let style = area.style();
    let _ = style.set_property("height", "auto");
    let scroll = u32::try_from(area.scroll_height()).unwrap_or(0);
    let height = textarea_height(&area.value(), scroll);
    let _ = style.set_property("height", &format!("{}px", height));
}

impl PreviewDom for WebDom {
    type Node = Node;

    fn text_nodes(&self, root: &Node) -> Vec<Node> {
        let walker = match self.document.create_tree_walker_with_what_to_show(root, SHOW_TEXT) {
            Ok(walker) => walker,
            Err(e) => {
                web_sys::console::warn_1(&e);
                return Vec::new();
            }
        };

        let selector = format!("[{}]", BOUND_ATTR);
        let mut out = Vec::new();
        while let Ok(Some(node)) = walker.next_node() {
            let inside_control = node
                .parent_element()
                .and_then(|parent| parent.closest(&selector).ok().flatten())
                .is_some();
            if !inside_control {
                out.push(node);
            }
        }
        out
    }

    fn text(&self, node: &Node) -> String {
        node.text_content().unwrap_or_default()
    }

    fn replace_with(&mut self, node: &Node, pieces: Vec<Piece>) -> Result<(), BindError> {
        let parent = node.parent_node().ok_or(BindError::Detached)?;
        let fragment = self.document.create_document_fragment();
        let mut textareas = Vec::new();

        for piece in &pieces {
            match piece {
                Piece::Text(text) => {
                    fragment
                        .append_child(&self.document.create_text_node(text))
                        .map_err(dom_error)?;
                }
                Piece::Control(bound) => {
                    let container = self.build_control(bound, &mut textareas).map_err(dom_error)?;
                    fragment.append_child(&container).map_err(dom_error)?;
                }
            }
        }

        parent.replace_child(&fragment, node).map_err(dom_error)?;
        for area in &textareas {
            resize_textarea(area);
        }
        Ok(())
    }

    fn tagged(&self, root: &Node, identity: &str) -> Vec<Node> {
        let Some(root) = root.dyn_ref::<Element>() else {
            return Vec::new();
        };
        let value = selector_value(identity);
        let selector = format!(
            "[{}=\"{}\"], [{}=\"{}\"]",
            FIELD_PATH_ATTR, value, FIELD_OWNER_ATTR, value
        );
        let Ok(list) = root.query_selector_all(&selector) else {
            return Vec::new();
        };
        (0..list.length()).filter_map(|i| list.item(i)).collect()
    }

    fn set_edit_state(&mut self, node: &Node, state: EditState) -> Result<(), BindError> {
        let element = node
            .dyn_ref::<Element>()
            .ok_or_else(|| BindError::Dom("Edit state target is not an element".to_string()))?;
        let classes = element.class_list();
        classes.remove_1(state.opposite().class_name()).map_err(dom_error)?;
        classes.add_1(state.class_name()).map_err(dom_error)?;
        Ok(())
    }

    fn clear(&mut self, root: &Node) {
        self.release_listeners();
        root.set_text_content(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_value_escapes_quotes() {
        assert_eq!(selector_value("checkbox:Check1"), "checkbox:Check1");
        assert_eq!(selector_value(r#"a"b"#), r#"a\"b"#);
        assert_eq!(selector_value(r"a\b"), r"a\\b");
    }

    proptest::proptest! {
        #[test]
        fn test_selector_value_has_no_bare_quote(value in r#"[a-z"\\:]{0,12}"#) {
            let escaped = selector_value(&value);
            let mut chars = escaped.chars();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => { proptest::prop_assert!(chars.next().is_some()); }
                    '"' => proptest::prop_assert!(false, "bare quote in {}", escaped),
                    _ => {}
                }
            }
        }
    }
}

// WASM-specific tests that run in a browser environment
#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use docfill_core::{marker, FieldValues, PreviewBinder, Schema};
    use std::cell::RefCell;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn root_with_text(dom: &WebDom, text: &str) -> Node {
        let root = dom.document().create_element("div").unwrap();
        root.set_text_content(Some(text));
        root.into()
    }

    fn schema() -> Schema {
        Schema::from_json(r#"{"properties": {"name": {"type": "string"}, "ok": {"type": "boolean"}}}"#).unwrap()
    }

    #[wasm_bindgen_test]
    fn test_bind_replaces_markers_with_controls() {
        let mut dom = WebDom::from_window(None).unwrap();
        let text = format!("Name: {} done", marker::encode("Ann", "name"));
        let root = root_with_text(&dom, &text);

        let schema = schema();
        let values = FieldValues::new();
        let report = PreviewBinder::new(&schema, &values, false).bind(&mut dom, &root);

        assert_eq!(report.controls, 1);
        let element: Element = root.clone().dyn_into().unwrap();
        let area = element.query_selector("textarea").unwrap().unwrap();
        assert_eq!(area.get_attribute(FIELD_PATH_ATTR).as_deref(), Some("name"));
        assert_eq!(area.unchecked_ref::<HtmlTextAreaElement>().value(), "Ann");
        assert!(element.text_content().unwrap().starts_with("Name: "));
    }

    #[wasm_bindgen_test]
    fn test_rebinding_skips_bound_controls() {
        let mut dom = WebDom::from_window(None).unwrap();
        let root = root_with_text(&dom, &marker::encode("x", "name"));
        let schema = schema();
        let values = FieldValues::new();
        let binder = PreviewBinder::new(&schema, &values, true);

        assert_eq!(binder.bind(&mut dom, &root).controls, 1);
        assert_eq!(binder.bind(&mut dom, &root).controls, 0);
    }

    #[wasm_bindgen_test]
    fn test_date_input_reports_on_every_keystroke() {
        let seen: Rc<RefCell<Vec<ChangeInput>>> = Rc::default();
        let sink = seen.clone();
        let handler: ChangeHandler = Rc::new(move |_, input| sink.borrow_mut().push(input));
        let mut dom = WebDom::from_window(Some(handler)).unwrap();
        let root = root_with_text(&dom, &marker::encode("   ", "due"));

        let schema =
            Schema::from_json(r#"{"properties": {"due": {"type": "string", "format": "date"}}}"#).unwrap();
        let values = FieldValues::new();
        PreviewBinder::new(&schema, &values, false).bind(&mut dom, &root);

        let element: Element = root.dyn_into().unwrap();
        let input: HtmlInputElement = element.query_selector("input").unwrap().unwrap().dyn_into().unwrap();
        input.set_value("2024-05-01");
        input.dispatch_event(&web_sys::Event::new("input").unwrap()).unwrap();

        assert_eq!(seen.borrow().as_slice(), &[ChangeInput::Value("2024-05-01".to_string())]);
    }

    #[wasm_bindgen_test]
    fn test_rerender_does_not_accumulate_listeners() {
        let handler: ChangeHandler = Rc::new(|_, _| {});
        let mut dom = WebDom::from_window(Some(handler)).unwrap();
        let schema = schema();
        let values = FieldValues::new();
        let binder = PreviewBinder::new(&schema, &values, false);
        let text = format!("{} {}", marker::encode("Ann", "name"), marker::encode("true", "ok"));
        let root = root_with_text(&dom, &text);

        for _ in 0..3 {
            dom.clear(&root);
            root.set_text_content(Some(&text));
            assert_eq!(binder.bind(&mut dom, &root).controls, 2);
            assert_eq!(dom.listener_count(), 2);
        }

        dom.release_listeners();
        assert_eq!(dom.listener_count(), 0);
    }

    #[wasm_bindgen_test]
    fn test_change_events_reach_handler() {
        let seen: Rc<RefCell<Vec<(String, ChangeInput)>>> = Rc::default();
        let sink = seen.clone();
        let handler: ChangeHandler = Rc::new(move |binding, input| sink.borrow_mut().push((binding.tag, input)));
        let mut dom = WebDom::from_window(Some(handler)).unwrap();
        let root = root_with_text(&dom, &marker::encode("false", "ok"));

        let schema = schema();
        let values = FieldValues::new();
        PreviewBinder::new(&schema, &values, false).bind(&mut dom, &root);

        let element: Element = root.dyn_into().unwrap();
        let input: HtmlInputElement = element.query_selector("input").unwrap().unwrap().dyn_into().unwrap();
        input.click();

        assert_eq!(seen.borrow().as_slice(), &[("ok".to_string(), ChangeInput::Checked(true))]);
    }
}

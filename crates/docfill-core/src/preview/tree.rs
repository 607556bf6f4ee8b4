//! In-memory preview tree
//!
//! A small arena-backed element/text tree implementing [`PreviewDom`]. The
//! native CLI and the test suite render previews into it; the browser build
//! uses the real DOM instead.

use std::collections::BTreeMap;

use super::{BoundControl, Control, Piece, PreviewDom, BOUND_ATTR, CONTAINER_CLASS, FIELD_OWNER_ATTR, FIELD_PATH_ATTR, SELECT_PLACEHOLDER};
use crate::error::BindError;
use crate::marker;
use crate::tracker::EditState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Default)]
pub struct ElementData {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub classes: Vec<String>,
    pub control: Option<BoundControl>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct PreviewTree {
    nodes: Vec<Node>,
}

impl Default for PreviewTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewTree {
    /// A tree holding a single empty `div` root
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element(ElementData {
                    tag: "div".to_string(),
                    ..Default::default()
                }),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn append(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.alloc(NodeKind::Element(ElementData {
            tag: tag.to_string(),
            ..Default::default()
        }));
        self.append(parent, id);
        id
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.alloc(NodeKind::Text(text.to_string()));
        self.append(parent, id);
        id
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(data) => Some(data),
            NodeKind::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(data) => Some(data),
            NodeKind::Text(_) => None,
        }
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attributes.get(name).map(String::as_str)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(element) = self.element_mut(id) {
            if !element.classes.iter().any(|c| c == class) {
                element.classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(element) = self.element_mut(id) {
            element.classes.retain(|c| c != class);
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .is_some_and(|e| e.classes.iter().any(|c| c == class))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn control(&self, id: NodeId) -> Option<&BoundControl> {
        self.element(id)?.control.as_ref()
    }

    /// Descendants of `root` in document order, `root` excluded
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Bound control elements under `root`, in document order
    pub fn controls(&self, root: NodeId) -> Vec<(NodeId, &BoundControl)> {
        self.descendants(root)
            .into_iter()
            .filter_map(|id| self.control(id).map(|c| (id, c)))
            .collect()
    }

    /// Concatenated text under `id`
    pub fn text_content(&self, id: NodeId) -> String {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => text.clone(),
            Some(NodeKind::Element(_)) => self
                .descendants(id)
                .into_iter()
                .filter_map(|d| match self.kind(d) {
                    Some(NodeKind::Text(text)) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    fn is_attached(&self, id: NodeId) -> bool {
        id == self.root() || self.parent(id).is_some()
    }

    /// Build the container and control element for one bound control
    fn build_control(&mut self, bound: BoundControl) -> NodeId {
        let container = self.alloc(NodeKind::Element(ElementData {
            tag: "span".to_string(),
            ..Default::default()
        }));
        self.add_class(container, CONTAINER_CLASS);
        self.set_attribute(container, BOUND_ATTR, "true");

        let tag = match &bound.control {
            Control::ReadonlyGlyph { .. } | Control::ReadonlyText { .. } | Control::Radio { .. } => "span",
            Control::Checkbox { .. } | Control::DateInput { .. } => "input",
            Control::Select { .. } => "select",
            Control::TextArea { .. } => "textarea",
        };
        let element = self.append_element(container, tag);
        self.add_class(element, bound.control.css_class());
        self.set_attribute(element, FIELD_PATH_ATTR, &bound.binding.tag);
        if let Some(owner) = &bound.binding.owner {
            self.set_attribute(element, FIELD_OWNER_ATTR, owner);
        }

        match &bound.control {
            Control::ReadonlyGlyph { glyph } => {
                self.append_text(element, glyph);
            }
            Control::ReadonlyText { text } => {
                self.append_text(element, text);
            }
            Control::Checkbox { checked } => {
                self.set_attribute(element, "type", "checkbox");
                if *checked {
                    self.set_attribute(element, "checked", "");
                }
            }
            Control::Radio { group, value, checked } => {
                let input = self.append_element(element, "input");
                self.set_attribute(input, "type", "radio");
                self.set_attribute(input, "name", group);
                self.set_attribute(input, "value", value);
                if *checked {
                    self.set_attribute(input, "checked", "");
                }
            }
            Control::Select { options, selected } => {
                let blank = self.append_element(element, "option");
                self.set_attribute(blank, "value", "");
                self.append_text(blank, SELECT_PLACEHOLDER);
                for option in options {
                    let node = self.append_element(element, "option");
                    self.set_attribute(node, "value", option);
                    if selected.as_deref() == Some(option.as_str()) {
                        self.set_attribute(node, "selected", "");
                    }
                    self.append_text(node, option);
                }
            }
            Control::DateInput { kind, value, placeholder } => {
                self.set_attribute(element, "type", kind.input_type());
                self.set_attribute(element, "value", value);
                self.set_attribute(element, "placeholder", placeholder);
            }
            Control::TextArea { value, placeholder } => {
                self.set_attribute(element, "rows", "1");
                self.set_attribute(element, "placeholder", placeholder);
                self.set_attribute(element, "value", value);
            }
        }

        if let Some(data) = self.element_mut(element) {
            data.control = Some(bound);
        }
        container
    }

    /// Text of the tree with every control written back as its marker.
    /// Handy for asserting where controls landed.
    pub fn to_marked_text(&self, root: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(bound) = self.control(id) {
                let payload = match &bound.control {
                    Control::ReadonlyGlyph { glyph } => glyph.clone(),
                    Control::ReadonlyText { text } => text.clone(),
                    Control::Checkbox { checked } | Control::Radio { checked, .. } => {
                        marker::glyph(*checked).to_string()
                    }
                    Control::Select { selected, .. } => selected.clone().unwrap_or_default(),
                    Control::DateInput { value, .. } | Control::TextArea { value, .. } => value.clone(),
                };
                out.push_str(&format!("[{}={}]", bound.binding.tag, payload));
                continue;
            }
            match self.kind(id) {
                Some(NodeKind::Text(text)) => out.push_str(text),
                Some(NodeKind::Element(_)) => stack.extend(self.children(id).iter().rev().copied()),
                None => {}
            }
        }
        out
    }
}

impl PreviewDom for PreviewTree {
    type Node = NodeId;

    fn text_nodes(&self, root: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(*root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            match self.kind(id) {
                Some(NodeKind::Text(_)) => out.push(id),
                Some(NodeKind::Element(data)) if !data.attributes.contains_key(BOUND_ATTR) => {
                    stack.extend(self.children(id).iter().rev().copied());
                }
                _ => {}
            }
        }
        out
    }

    fn text(&self, node: &NodeId) -> String {
        match self.kind(*node) {
            Some(NodeKind::Text(text)) => text.clone(),
            _ => String::new(),
        }
    }

    fn replace_with(&mut self, node: &NodeId, pieces: Vec<Piece>) -> Result<(), BindError> {
        if !matches!(self.kind(*node), Some(NodeKind::Text(_))) {
            return Err(BindError::Dom(format!("node {:?} is not a text node", node)));
        }
        let parent = self.parent(*node).ok_or(BindError::Detached)?;
        let index = self.nodes[parent.0]
            .children
            .iter()
            .position(|c| c == node)
            .ok_or(BindError::Detached)?;

        let mut replacement = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let id = match piece {
                Piece::Text(text) if text.is_empty() => continue,
                Piece::Text(text) => self.alloc(NodeKind::Text(text)),
                Piece::Control(bound) => self.build_control(bound),
            };
            self.nodes[id.0].parent = Some(parent);
            replacement.push(id);
        }

        self.nodes[node.0].parent = None;
        self.nodes[parent.0]
            .children
            .splice(index..=index, replacement);
        Ok(())
    }

    fn tagged(&self, root: &NodeId, identity: &str) -> Vec<NodeId> {
        self.descendants(*root)
            .into_iter()
            .filter(|id| {
                self.attribute(*id, FIELD_PATH_ATTR) == Some(identity)
                    || self.attribute(*id, FIELD_OWNER_ATTR) == Some(identity)
            })
            .collect()
    }

    fn set_edit_state(&mut self, node: &NodeId, state: EditState) -> Result<(), BindError> {
        if !self.is_attached(*node) {
            return Err(BindError::Detached);
        }
        self.remove_class(*node, state.opposite().class_name());
        self.add_class(*node, state.class_name());
        Ok(())
    }

    fn clear(&mut self, root: &NodeId) {
        let children = std::mem::take(&mut self.nodes[root.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }
}

//! Text-level preview renderer for the in-memory tree

use quick_xml::events::Event;
use quick_xml::Reader;

use super::tree::{NodeId, PreviewTree};
use super::{PreviewDom, PreviewRenderer};
use crate::error::DocfillError;
use crate::package::DocxPackage;

pub const PREVIEW_CLASS: &str = "docx-preview";

/// Renders the main document part into paragraphs, tables and runs.
///
/// Formatting is ignored; only structure and text survive, which is all the
/// binder needs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxTextPreview;

impl DocxTextPreview {
    pub fn new() -> Self {
        Self
    }

    /// Render WordprocessingML into `tree` under `root`
    pub fn render_xml(&self, xml: &str, tree: &mut PreviewTree, root: NodeId) -> Result<(), DocfillError> {
        let section = tree.append_element(root, "section");
        tree.add_class(section, PREVIEW_CLASS);

        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut stack = vec![section];
        let mut in_text = false;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| DocfillError::Xml(format!("at byte {}: {}", reader.buffer_position(), e)))?;
            let parent = stack.last().copied().unwrap_or(section);

            match event {
                Event::Start(e) => match e.name().as_ref() {
                    b"w:t" => in_text = true,
                    name => {
                        if let Some(tag) = html_tag(name) {
                            stack.push(tree.append_element(parent, tag));
                        }
                    }
                },
                Event::End(e) => match e.name().as_ref() {
                    b"w:t" => in_text = false,
                    name => {
                        if html_tag(name).is_some() && stack.len() > 1 {
                            stack.pop();
                        }
                    }
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"w:br" | b"w:cr" => {
                        tree.append_element(parent, "br");
                    }
                    b"w:tab" => {
                        tree.append_text(parent, "\t");
                    }
                    b"w:p" => {
                        tree.append_element(parent, "p");
                    }
                    _ => {}
                },
                Event::Text(t) if in_text => {
                    let text = t
                        .unescape()
                        .map_err(|e| DocfillError::Xml(e.to_string()))?;
                    if !text.is_empty() {
                        tree.append_text(parent, &text);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(())
    }
}

fn html_tag(name: &[u8]) -> Option<&'static str> {
    match name {
        b"w:p" => Some("p"),
        b"w:r" => Some("span"),
        b"w:tbl" => Some("table"),
        b"w:tr" => Some("tr"),
        b"w:tc" => Some("td"),
        _ => None,
    }
}

impl PreviewRenderer for DocxTextPreview {
    type Dom = PreviewTree;

    fn render(&mut self, document: &[u8], dom: &mut PreviewTree, root: &NodeId) -> Result<(), DocfillError> {
        let package = DocxPackage::from_bytes(document)?;
        dom.clear(root);
        self.render_xml(package.main_document()?, dom, *root)
    }
}

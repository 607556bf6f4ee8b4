//! WordprocessingML text-run helpers shared by the package and the template

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;
use std::ops::Range;

lazy_static! {
    /// `<w:t>` elements; their content never holds child elements
    static ref TEXT_ELEMENT: Regex = Regex::new(r"<w:t(?:\s[^>/]*)?>([^<]*)</w:t>").unwrap();
}

/// Opening tag used for any `<w:t>` we rewrite
pub(crate) const PRESERVED_TEXT_OPEN: &str = r#"<w:t xml:space="preserve">"#;

/// A `<w:t>` element in a part
#[derive(Debug, Clone)]
pub(crate) struct TextSegment {
    /// Byte range of the whole element
    pub element: Range<usize>,
    /// Unescaped text content
    pub text: String,
}

pub(crate) fn text_segments(xml: &str) -> Vec<TextSegment> {
    TEXT_ELEMENT
        .captures_iter(xml)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(TextSegment {
                element: whole.range(),
                text: unescape_text(&caps[1]).into_owned(),
            })
        })
        .collect()
}

/// Concatenated text of every run, in document order
pub(crate) fn full_text(xml: &str) -> String {
    text_segments(xml).into_iter().map(|s| s.text).collect()
}

pub(crate) fn escape_text(text: &str) -> Cow<'_, str> {
    quick_xml::escape::partial_escape(text)
}

/// Unescape entity references, keeping the raw text if it is malformed
pub(crate) fn unescape_text(raw: &str) -> Cow<'_, str> {
    match quick_xml::escape::unescape(raw) {
        Ok(text) => text,
        Err(_) => Cow::Borrowed(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_skip_other_w_t_prefixed_elements() {
        let xml = r#"<w:p><w:r><w:tab/><w:t>Hi</w:t></w:r><w:tbl/><w:r><w:t xml:space="preserve"> there</w:t></w:r></w:p>"#;
        let segments = text_segments(xml);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].text, " there");
        assert_eq!(full_text(xml), "Hi there");
    }

    #[test]
    fn test_entities_unescaped() {
        assert_eq!(full_text("<w:t>A &amp; B &lt;C&gt;</w:t>"), "A & B <C>");
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a<b&c"), "a&lt;b&amp;c");
    }
}

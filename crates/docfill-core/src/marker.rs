//! Marker codec
//!
//! Rendered preview documents tag every field with an inline marker of the
//! form `|||payload|||fieldPath|||`. The payload is the field's display value
//! (or a checkbox glyph) and the field path is either a schema field name or
//! `checkbox:<bookmark>`. Markers only live between rendering and binding.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::ops::Range;

pub const DELIMITER: &str = "|||";
pub const CHECKBOX_PREFIX: &str = "checkbox:";

/// Stands in for `\n` inside payloads
pub const NEWLINE_TOKEN: &str = "__NEWLINE__";

/// Stands in for a literal `|` inside payloads
pub const PIPE_TOKEN: &str = "__PIPE__";

/// Payload used for fields that have no value yet
pub const BLANK_PAYLOAD: &str = "   ";

pub const CHECKED_GLYPH: &str = "☑";
pub const UNCHECKED_GLYPH: &str = "☐";

lazy_static! {
    static ref MARKER_PATTERN: Regex = Regex::new(r"\|\|\|([^|]*)\|\|\|([^|]+)\|\|\|").unwrap();
}

/// Identity carried by a marker
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldPath {
    Field(String),
    Checkbox(String),
}

impl FieldPath {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(CHECKBOX_PREFIX) {
            Some(bookmark) => FieldPath::Checkbox(bookmark.to_string()),
            None => FieldPath::Field(raw.to_string()),
        }
    }

    /// Field name or bookmark name, without the checkbox prefix
    pub fn name(&self) -> &str {
        match self {
            FieldPath::Field(name) | FieldPath::Checkbox(name) => name,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Field(name) => write!(f, "{}", name),
            FieldPath::Checkbox(name) => write!(f, "{}{}", CHECKBOX_PREFIX, name),
        }
    }
}

/// A decoded marker and where it sat in the scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerMatch {
    pub payload: String,
    pub field_path: FieldPath,
    /// Byte range of the whole marker in the source text
    pub span: Range<usize>,
}

impl MarkerMatch {
    /// True for the fallback payload of unfilled fields
    pub fn is_blank(&self) -> bool {
        self.payload.trim().is_empty()
    }
}

pub fn encode(payload: &str, field_path: &str) -> String {
    format!(
        "{d}{}{d}{}{d}",
        payload.replace('|', PIPE_TOKEN),
        field_path,
        d = DELIMITER
    )
}

pub fn encode_checkbox(checked: bool, bookmark: &str) -> String {
    encode(glyph(checked), &format!("{}{}", CHECKBOX_PREFIX, bookmark))
}

/// All markers in `text`, left to right, non-overlapping
pub fn decode(text: &str) -> Vec<MarkerMatch> {
    MARKER_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(MarkerMatch {
                payload: caps[1].replace(PIPE_TOKEN, "|"),
                field_path: FieldPath::parse(&caps[2]),
                span: whole.range(),
            })
        })
        .collect()
}

pub fn contains_marker(text: &str) -> bool {
    MARKER_PATTERN.is_match(text)
}

pub fn escape_newlines(value: &str) -> String {
    value.replace('\n', NEWLINE_TOKEN)
}

pub fn restore_newlines(value: &str) -> String {
    value.replace(NEWLINE_TOKEN, "\n")
}

pub fn glyph(checked: bool) -> &'static str {
    if checked {
        CHECKED_GLYPH
    } else {
        UNCHECKED_GLYPH
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_encode_field() {
        assert_eq!(encode("Alice", "name"), "|||Alice|||name|||");
    }

    #[test]
    fn test_encode_checkbox() {
        assert_eq!(
            encode_checkbox(true, "Check1"),
            "|||☑|||checkbox:Check1|||"
        );
        assert_eq!(
            encode_checkbox(false, "Check2"),
            "|||☐|||checkbox:Check2|||"
        );
    }

    #[test]
    fn test_decode_multiple_with_spans() {
        let text = "Hello |||Alice|||name|||, age |||   |||age||| done";
        let markers = decode(text);
        assert_eq!(markers.len(), 2);

        assert_eq!(markers[0].payload, "Alice");
        assert_eq!(markers[0].field_path, FieldPath::Field("name".to_string()));
        assert_eq!(&text[markers[0].span.clone()], "|||Alice|||name|||");

        assert!(markers[1].is_blank());
        assert_eq!(&text[..markers[0].span.start], "Hello ");
        assert_eq!(&text[markers[1].span.end..], " done");
    }

    #[test]
    fn test_decode_empty_payload() {
        let markers = decode("||||||checkbox:Check7|||");
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].payload, "");
        assert_eq!(
            markers[0].field_path,
            FieldPath::Checkbox("Check7".to_string())
        );
    }

    #[test]
    fn test_decode_adjacent_markers() {
        let markers = decode("|||a|||x||||||b|||y|||");
        let paths: Vec<String> = markers.iter().map(|m| m.field_path.to_string()).collect();
        assert_eq!(paths, vec!["x", "y"]);
    }

    #[test]
    fn test_malformed_marker_is_plain_text() {
        assert!(decode("a ||| b ||| c").is_empty());
        assert!(decode("|||value|||").is_empty());
        assert!(!contains_marker("||x||y||"));
    }

    #[test]
    fn test_pipe_in_payload_round_trips() {
        let encoded = encode("a|b", "field");
        let markers = decode(&encoded);
        assert_eq!(markers[0].payload, "a|b");
    }

    #[test]
    fn test_newline_escape() {
        let escaped = escape_newlines("line1\nline2");
        assert_eq!(escaped, "line1__NEWLINE__line2");
        assert_eq!(restore_newlines(&escaped), "line1\nline2");
    }

    proptest! {
        /// Property: encode then decode returns the payload and field path
        #[test]
        fn marker_round_trip(payload in "[^\n]{0,40}", field in "[A-Za-z_][A-Za-z0-9_.]{0,20}") {
            prop_assume!(!payload.contains(PIPE_TOKEN));
            let encoded = encode(&payload, &field);
            let markers = decode(&encoded);
            prop_assert_eq!(markers.len(), 1);
            prop_assert_eq!(&markers[0].payload, &payload);
            prop_assert_eq!(markers[0].field_path.to_string(), field);
            prop_assert_eq!(markers[0].span.clone(), 0..encoded.len());
        }

        /// Property: decoding arbitrary text never panics and spans stay in bounds
        #[test]
        fn decode_spans_in_bounds(text in "\\PC{0,80}") {
            let mut last_end = 0;
            for marker in decode(&text) {
                prop_assert!(marker.span.start >= last_end);
                prop_assert!(marker.span.end <= text.len());
                last_end = marker.span.end;
            }
        }
    }
}

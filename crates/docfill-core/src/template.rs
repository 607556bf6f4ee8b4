//! Template renderer
//!
//! Finds `{name}` tags in the document text and substitutes field values.
//! Word frequently splits a tag over several `<w:t>` runs (spell checking,
//! revision marks, formatting changes), so substitution works on the
//! concatenated run text and writes each replacement back into the run where
//! its tag starts.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::checkbox::CheckboxResolver;
use crate::error::DocfillError;
use crate::marker;
use crate::package::DocxPackage;
use crate::schema::Schema;
use crate::value::{FieldValue, FieldValues};
use crate::wordml::{self, PRESERVED_TEXT_OPEN};

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([^{}]+)\}").unwrap();
}

const LINE_BREAK: &str = r#"</w:t><w:br/><w:t xml:space="preserve">"#;

/// Output flavour of a render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Values wrapped in markers, checkboxes as glyph markers
    #[default]
    Preview,
    /// Plain values, checkbox defaults written into the form fields
    Final,
}

/// Unique placeholder names in first-occurrence order
pub fn extract_placeholders(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in PLACEHOLDER.captures_iter(text) {
        let name = caps[1].trim();
        if name.is_empty() || seen.iter().any(|s: &String| s == name) {
            continue;
        }
        seen.push(name.to_string());
    }
    seen
}

/// Starting values for placeholders before initial data is merged
pub fn compute_defaults(placeholders: &[String], schema: Option<&Schema>) -> FieldValues {
    placeholders
        .iter()
        .map(|name| {
            let value = schema
                .and_then(|s| s.field(name))
                .map(|config| config.default_value())
                .unwrap_or_else(|| FieldValue::Text(String::new()));
            (name.clone(), value)
        })
        .collect()
}

/// Render a package with the given values
pub fn render(
    package: &DocxPackage,
    values: &FieldValues,
    schema: Option<&Schema>,
    mode: RenderMode,
) -> Result<DocxPackage, DocfillError> {
    let mut output = package.clone();
    let main_part = package.main_part_name().to_string();

    for part in package.templated_parts() {
        let xml = package.part_text(&part)?;
        let mut rendered = substitute(
            xml,
            |name| Ok(replacement(name, values, schema, mode)),
            mode == RenderMode::Final,
        )
        .map_err(|e| match e {
            DocfillError::Template(msg) => DocfillError::Template(format!("{} in {}", msg, part)),
            other => other,
        })?;

        if part == main_part {
            rendered = CheckboxResolver::new(schema, values).apply(&rendered, mode);
        }
        output.set_part(&part, rendered);
    }

    tracing::debug!(?mode, fields = values.len(), "Rendered template");
    Ok(output)
}

/// Render straight from archive bytes to archive bytes
pub fn render_bytes(
    template: &[u8],
    values: &FieldValues,
    schema: Option<&Schema>,
    mode: RenderMode,
) -> Result<Vec<u8>, DocfillError> {
    let package = DocxPackage::from_bytes(template)?;
    render(&package, values, schema, mode)?.to_bytes()
}

fn replacement(
    name: &str,
    values: &FieldValues,
    schema: Option<&Schema>,
    mode: RenderMode,
) -> String {
    let value = values.get(name).filter(|v| !v.is_empty());

    match mode {
        RenderMode::Preview => match value {
            Some(v) => marker::encode(&marker::escape_newlines(&v.display()), name),
            None => marker::encode(marker::BLANK_PAYLOAD, name),
        },
        RenderMode::Final => {
            let Some(v) = value else {
                return String::new();
            };
            let is_boolean = schema
                .and_then(|s| s.field(name))
                .is_some_and(|config| config.is_boolean());
            match v.as_bool() {
                Some(checked) if is_boolean => marker::glyph(checked).to_string(),
                _ => v.display(),
            }
        }
    }
}

struct Tag {
    start: usize,
    end: usize,
    replacement: String,
}

/// Replace every tag in the runs of `xml`.
///
/// Runs that contain no part of any tag are copied unchanged. When
/// `line_breaks` is set, newlines in replacement text become `<w:br/>`.
pub(crate) fn substitute<F>(xml: &str, mut resolve: F, line_breaks: bool) -> Result<String, DocfillError>
where
    F: FnMut(&str) -> Result<String, DocfillError>,
{
    let segments = wordml::text_segments(xml);
    if segments.is_empty() {
        return Ok(xml.to_string());
    }

    let mut joined = String::new();
    let mut offsets = Vec::with_capacity(segments.len());
    for segment in &segments {
        offsets.push(joined.len());
        joined.push_str(&segment.text);
    }

    let mut tags = Vec::new();
    let mut covered = 0;
    for caps in PLACEHOLDER.captures_iter(&joined) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        check_unclosed(&joined[covered..whole.start()])?;
        covered = whole.end();
        // `{ }` names no field; it stays as literal text
        let name = caps[1].trim();
        if name.is_empty() {
            continue;
        }
        tags.push(Tag {
            start: whole.start(),
            end: whole.end(),
            replacement: resolve(name)?,
        });
    }
    check_unclosed(&joined[covered..])?;

    if tags.is_empty() {
        return Ok(xml.to_string());
    }

    let mut output = String::with_capacity(xml.len());
    let mut copied = 0;
    let mut first_tag = 0;

    for (segment, &start) in segments.iter().zip(&offsets) {
        let end = start + segment.text.len();
        while first_tag < tags.len() && tags[first_tag].end <= start {
            first_tag += 1;
        }

        let mut text = String::new();
        let mut cursor = start;
        let mut touched = false;
        for tag in tags[first_tag..].iter().take_while(|t| t.start < end) {
            touched = true;
            if tag.start > cursor {
                text.push_str(&joined[cursor..tag.start]);
            }
            if tag.start >= start {
                text.push_str(&tag.replacement);
            }
            cursor = cursor.max(tag.end.min(end));
        }
        if !touched {
            continue;
        }
        if cursor < end {
            text.push_str(&joined[cursor..end]);
        }

        output.push_str(&xml[copied..segment.element.start]);
        output.push_str(PRESERVED_TEXT_OPEN);
        let escaped = wordml::escape_text(&text);
        if line_breaks {
            output.push_str(&escaped.replace('\n', LINE_BREAK));
        } else {
            output.push_str(&escaped);
        }
        output.push_str("</w:t>");
        copied = segment.element.end;
    }
    output.push_str(&xml[copied..]);

    Ok(output)
}

fn check_unclosed(text: &str) -> Result<(), DocfillError> {
    match text.find('{') {
        Some(pos) => {
            let snippet: String = text[pos..].chars().take(20).collect();
            Err(DocfillError::Template(format!(
                "Unclosed tag near \"{}\"",
                snippet
            )))
        }
        None => Ok(()),
    }
}

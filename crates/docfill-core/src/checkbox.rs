//! Checkbox and radio resolution for legacy Word form fields
//!
//! Form-field checkboxes are found through their bookmarks, which Word names
//! `Check1`, `Check2`, ... A bookmark is either owned by a schema field
//! through its `docx_mapping` or, failing that, looked up directly by name in
//! the field values.
//!
//! Final mode writes the checked state into the form field's `w:default`
//! (and `w:checked`, when present). Preview mode puts a glyph marker in a
//! new run in front of each bookmark so the binder can swap it for a
//! control.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashSet;

use crate::marker;
use crate::schema::Schema;
use crate::template::RenderMode;
use crate::value::{FieldValue, FieldValues};

lazy_static! {
    static ref BOOKMARK_START: Regex =
        Regex::new(r#"(?i)<w:bookmarkStart\b[^>]*\bw:name="(Check\d+)"[^>]*/>"#).unwrap();
    static ref FIELD_BEGIN_BLOCK: Regex =
        Regex::new(r#"(?s)<w:fldChar\b([^>/]*)>(.*?)</w:fldChar>"#).unwrap();
    static ref FORM_FIELD_NAME: Regex = Regex::new(r#"<w:name\b[^>]*\bw:val="([^"]*)""#).unwrap();
    static ref DEFAULT_STATE: Regex = Regex::new(r#"(<w:default\b[^>]*\bw:val=")([01])(")"#).unwrap();
    static ref CHECKED_STATE: Regex = Regex::new(r#"<w:checked\b[^>]*/>"#).unwrap();
}

/// Resolves checkbox state from field values and an optional schema
pub struct CheckboxResolver<'a> {
    schema: Option<&'a Schema>,
    values: &'a FieldValues,
}

impl<'a> CheckboxResolver<'a> {
    pub fn new(schema: Option<&'a Schema>, values: &'a FieldValues) -> Self {
        Self { schema, values }
    }

    /// Whether `bookmark` should render checked
    pub fn resolve(&self, bookmark: &str) -> bool {
        if let Some(role) = self.schema.and_then(|s| s.bookmark_role(bookmark)) {
            return role.is_checked(self.values);
        }
        self.values.get(bookmark).and_then(FieldValue::as_bool) == Some(true)
    }

    /// Checkbox bookmark names in document order, without duplicates
    pub fn discover_bookmarks(xml: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        BOOKMARK_START
            .captures_iter(xml)
            .map(|caps| caps[1].to_string())
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// Rewrite the main document part for `mode`
    pub fn apply(&self, xml: &str, mode: RenderMode) -> String {
        let bookmarks = Self::discover_bookmarks(xml);
        if bookmarks.is_empty() {
            return xml.to_string();
        }
        tracing::debug!(count = bookmarks.len(), ?mode, "Resolving checkbox bookmarks");

        match mode {
            RenderMode::Final => self.apply_final(xml, &bookmarks),
            RenderMode::Preview => self.apply_preview(xml),
        }
    }

    fn apply_final(&self, xml: &str, bookmarks: &[String]) -> String {
        FIELD_BEGIN_BLOCK
            .replace_all(xml, |caps: &Captures| {
                let block = &caps[0];
                if !caps[1].contains(r#"w:fldCharType="begin""#) || !caps[2].contains("<w:checkBox") {
                    return block.to_string();
                }
                let Some(name) = FORM_FIELD_NAME.captures(&caps[2]) else {
                    return block.to_string();
                };
                let name = &name[1];
                if !bookmarks.iter().any(|b| b == name) {
                    return block.to_string();
                }
                match rewrite_state(block, self.resolve(name)) {
                    Some(rewritten) => rewritten,
                    None => {
                        tracing::warn!(bookmark = %name, "Checkbox form field has no default state; left unchanged");
                        block.to_string()
                    }
                }
            })
            .into_owned()
    }

    fn apply_preview(&self, xml: &str) -> String {
        BOOKMARK_START
            .replace_all(xml, |caps: &Captures| {
                let marker = marker::encode_checkbox(self.resolve(&caps[1]), &caps[1]);
                format!("<w:r><w:t>{}</w:t></w:r>{}", marker, &caps[0])
            })
            .into_owned()
    }
}

/// Set the default (and explicit checked) state of one form-field block
fn rewrite_state(block: &str, checked: bool) -> Option<String> {
    if !DEFAULT_STATE.is_match(block) {
        return None;
    }
    let flag = if checked { "1" } else { "0" };
    let block = DEFAULT_STATE.replace(block, |caps: &Captures| format!("{}{}{}", &caps[1], flag, &caps[3]));
    let block = CHECKED_STATE.replace_all(&block, format!(r#"<w:checked w:val="{}"/>"#, flag).as_str());
    Some(block.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn form_checkbox(name: &str, default: u8) -> String {
        format!(
            r#"<w:p><w:bookmarkStart w:id="{id}" w:name="{name}"/><w:r><w:fldChar w:fldCharType="begin"><w:ffData><w:name w:val="{name}"/><w:enabled/><w:calcOnExit w:val="0"/><w:checkBox><w:sizeAuto/><w:default w:val="{default}"/></w:checkBox></w:ffData></w:fldChar></w:r><w:r><w:instrText xml:space="preserve"> FORMCHECKBOX </w:instrText></w:r><w:r><w:fldChar w:fldCharType="end"/></w:r><w:bookmarkEnd w:id="{id}"/></w:p>"#,
            id = name.trim_start_matches("Check"),
            name = name,
            default = default
        )
    }

    fn dual_schema() -> Schema {
        Schema::from_json(
            r#"{"properties": {
                "isCriticalEquipment": {
                    "type": "boolean",
                    "docx_mapping": { "type": "checkbox", "true_name": "Check1", "false_name": "Check2" }
                },
                "size": {
                    "type": "string",
                    "docx_mapping": { "type": "radio", "mapping": [
                        { "name": "Check3", "value": "S" },
                        { "name": "Check4", "value": "M" }
                    ] }
                }
            }}"#,
        )
        .unwrap()
    }

    fn vals(pairs: &[(&str, FieldValue)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_discover_ordered_unique() {
        let xml = format!(
            "{}{}{}",
            form_checkbox("Check2", 0),
            form_checkbox("Check1", 0),
            form_checkbox("Check2", 0)
        );
        assert_eq!(
            CheckboxResolver::discover_bookmarks(&xml),
            vec!["Check2", "Check1"]
        );
    }

    #[test]
    fn test_discover_ignores_other_bookmarks() {
        let xml = r#"<w:bookmarkStart w:id="1" w:name="_GoBack"/><w:bookmarkStart w:name="Text1" w:id="2"/>"#;
        assert!(CheckboxResolver::discover_bookmarks(xml).is_empty());
    }

    #[test]
    fn test_resolve_dual_mapping() {
        let schema = dual_schema();
        let values = vals(&[("isCriticalEquipment", true.into())]);
        let resolver = CheckboxResolver::new(Some(&schema), &values);
        assert!(resolver.resolve("Check1"));
        assert!(!resolver.resolve("Check2"));

        let values = vals(&[("isCriticalEquipment", false.into())]);
        let resolver = CheckboxResolver::new(Some(&schema), &values);
        assert!(!resolver.resolve("Check1"));
        assert!(resolver.resolve("Check2"));
    }

    #[test]
    fn test_resolve_radio_mapping() {
        let schema = dual_schema();
        let values = vals(&[("size", "M".into())]);
        let resolver = CheckboxResolver::new(Some(&schema), &values);
        assert!(!resolver.resolve("Check3"));
        assert!(resolver.resolve("Check4"));
    }

    #[test]
    fn test_resolve_flat_fallback() {
        let values = vals(&[("Check7", true.into())]);
        let resolver = CheckboxResolver::new(None, &values);
        assert!(resolver.resolve("Check7"));
        assert!(!resolver.resolve("Check8"));

        let schema = dual_schema();
        let resolver = CheckboxResolver::new(Some(&schema), &values);
        assert!(resolver.resolve("Check7"));
    }

    #[test]
    fn test_final_mode_rewrites_defaults() {
        let schema = dual_schema();
        let xml = format!("{}{}", form_checkbox("Check1", 0), form_checkbox("Check2", 1));
        let values = vals(&[("isCriticalEquipment", true.into())]);
        let out = CheckboxResolver::new(Some(&schema), &values).apply(&xml, RenderMode::Final);

        let expected = format!("{}{}", form_checkbox("Check1", 1), form_checkbox("Check2", 0));
        assert_eq!(out, expected);
        assert!(!marker::contains_marker(&out));
    }

    #[test]
    fn test_final_mode_syncs_explicit_checked_state() {
        let xml = form_checkbox("Check5", 1).replace("<w:sizeAuto/>", "<w:sizeAuto/><w:checked/>");
        let values = FieldValues::new();
        let out = CheckboxResolver::new(None, &values).apply(&xml, RenderMode::Final);
        assert!(out.contains(r#"<w:default w:val="0"/>"#));
        assert!(out.contains(r#"<w:checked w:val="0"/>"#));
    }

    #[test]
    fn test_final_mode_block_scoped() {
        // Check1's block has no default; Check2's default must not be touched for it
        let first = form_checkbox("Check1", 0).replace(r#"<w:default w:val="0"/>"#, "");
        let xml = format!("{}{}", first, form_checkbox("Check2", 1));
        let values = vals(&[("Check1", true.into()), ("Check2", true.into())]);
        let out = CheckboxResolver::new(None, &values).apply(&xml, RenderMode::Final);
        assert_eq!(out, xml);
    }

    #[test]
    fn test_preview_inserts_marker_before_bookmark() {
        let xml = form_checkbox("Check1", 0);
        let values = vals(&[("Check1", true.into())]);
        let out = CheckboxResolver::new(None, &values).apply(&xml, RenderMode::Preview);
        assert!(out.starts_with(
            r#"<w:p><w:r><w:t>|||☑|||checkbox:Check1|||</w:t></w:r><w:bookmarkStart w:id="1" w:name="Check1"/>"#
        ));
        assert_eq!(out.replace("<w:r><w:t>|||☑|||checkbox:Check1|||</w:t></w:r>", ""), xml);
    }

    #[test]
    fn test_no_bookmarks_is_identity() {
        let xml = "<w:p><w:r><w:t>plain</w:t></w:r></w:p>";
        let values = FieldValues::new();
        let resolver = CheckboxResolver::new(None, &values);
        assert_eq!(resolver.apply(xml, RenderMode::Final), xml);
        assert_eq!(resolver.apply(xml, RenderMode::Preview), xml);
    }

    proptest! {
        /// Property: preview mode only adds runs; stripping them restores the input
        #[test]
        fn preview_only_adds_marker_runs(states in proptest::collection::vec(any::<bool>(), 1..8)) {
            let xml: String = (1..=states.len()).map(|i| form_checkbox(&format!("Check{}", i), 0)).collect();
            let values: FieldValues = states
                .iter()
                .enumerate()
                .map(|(i, s)| (format!("Check{}", i + 1), FieldValue::Bool(*s)))
                .collect();
            let out = CheckboxResolver::new(None, &values).apply(&xml, RenderMode::Preview);

            let markers = marker::decode(&out);
            prop_assert_eq!(markers.len(), states.len());
            for (m, checked) in markers.iter().zip(&states) {
                prop_assert_eq!(m.payload.as_str(), marker::glyph(*checked));
            }

            let mut stripped = out.clone();
            for m in markers.iter().rev() {
                stripped.replace_range(m.span.start - "<w:r><w:t>".len()..m.span.end + "</w:t></w:r>".len(), "");
            }
            prop_assert_eq!(stripped, xml);
        }

        /// Property: final mode changes only default values
        #[test]
        fn final_mode_changes_only_defaults(states in proptest::collection::vec(any::<bool>(), 1..8)) {
            let xml: String = (1..=states.len()).map(|i| form_checkbox(&format!("Check{}", i), 0)).collect();
            let values: FieldValues = states
                .iter()
                .enumerate()
                .map(|(i, s)| (format!("Check{}", i + 1), FieldValue::Bool(*s)))
                .collect();
            let out = CheckboxResolver::new(None, &values).apply(&xml, RenderMode::Final);
            let expected: String = states
                .iter()
                .enumerate()
                .map(|(i, s)| form_checkbox(&format!("Check{}", i + 1), u8::from(*s)))
                .collect();
            prop_assert_eq!(out, expected);
        }
    }
}

use anyhow::{bail, Context, Result};
use docfill_core::preview::NodeId;
use docfill_core::{
    CheckboxResolver, DocxPackage, DocxTextPreview, EditorSession, FieldValues, PreviewTree, RenderMode, Schema,
    SchemaIssue, SessionOptions, TemplateSource,
};
use serde::Serialize;

/// A checkbox bookmark and the field that drives it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookmarkInfo {
    pub bookmark: String,
    pub field: Option<String>,
    pub checked: bool,
}

pub fn load_schema(json: Option<&str>) -> Result<Schema> {
    match json {
        Some(json) => Schema::from_json(json).context("Invalid schema"),
        None => Ok(Schema::default()),
    }
}

pub fn load_values(json: Option<&str>) -> Result<FieldValues> {
    match json {
        Some(json) => serde_json::from_str(json).context("Invalid field values"),
        None => Ok(FieldValues::new()),
    }
}

/// Placeholder names in first-occurrence order
pub fn placeholders(template: &[u8]) -> Result<Vec<String>> {
    let package = DocxPackage::from_bytes(template).context("Failed to open template")?;
    let text = package.full_text()?;
    Ok(docfill_core::extract_placeholders(&text))
}

/// Checkbox bookmarks of the main part with their resolved state
pub fn bookmarks(template: &[u8], schema: &Schema, values: &FieldValues) -> Result<Vec<BookmarkInfo>> {
    let package = DocxPackage::from_bytes(template).context("Failed to open template")?;
    let xml = package.main_document()?;
    let resolver = CheckboxResolver::new(Some(schema), values);

    Ok(CheckboxResolver::discover_bookmarks(xml)
        .into_iter()
        .map(|bookmark| BookmarkInfo {
            field: schema.bookmark_role(&bookmark).map(|role| role.field),
            checked: resolver.resolve(&bookmark),
            bookmark,
        })
        .collect())
}

pub fn validate(schema: &Schema) -> Vec<SchemaIssue> {
    schema.validate()
}

/// Load a template through `source` and render it in `mode`
pub async fn fill<S>(
    source: &S,
    location: &str,
    schema: Schema,
    values: FieldValues,
    mode: RenderMode,
) -> Result<Vec<u8>>
where
    S: TemplateSource + ?Sized,
{
    let mut session = EditorSession::new(schema, values, SessionOptions::default());
    session
        .load_from(source, location)
        .await
        .with_context(|| format!("Failed to load {}", location))?;

    let bytes = match mode {
        RenderMode::Final => session.export()?,
        RenderMode::Preview => session.begin_render()?.document,
    };
    tracing::info!(location, ?mode, bytes = bytes.len(), "Filled template");
    Ok(bytes)
}

/// Bind the text preview of a template and return one line per paragraph,
/// with every control written as `[fieldPath=value]`
pub fn preview(template: &[u8], schema: Schema, values: FieldValues, readonly: bool) -> Result<Vec<String>> {
    let options = SessionOptions {
        readonly,
        ..SessionOptions::default()
    };
    let mut session = EditorSession::new(schema, values, options);
    session.load_bytes(template)?;

    let mut tree = PreviewTree::new();
    let root = tree.root();
    let outcome = session.render_preview(&mut DocxTextPreview::new(), &mut tree, &root)?;
    let docfill_core::BindOutcome::Bound(report) = outcome else {
        bail!("Preview was not bound: {:?}", outcome);
    };
    tracing::debug!(controls = report.controls, failed = report.failed, "Preview bound");

    let paragraphs: Vec<NodeId> = tree
        .descendants(root)
        .into_iter()
        .filter(|id| tree.tag(*id) == Some("p"))
        .collect();
    Ok(paragraphs.into_iter().map(|id| tree.to_marked_text(id)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfill_core::{FieldValue, MemorySource};
    use pretty_assertions::assert_eq;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

    fn checkbox(name: &str, id: u32, default: u8) -> String {
        format!(
            r#"<w:p><w:bookmarkStart w:id="{id}" w:name="{name}"/><w:r><w:fldChar w:fldCharType="begin"><w:ffData><w:name w:val="{name}"/><w:checkBox><w:default w:val="{default}"/></w:checkBox></w:ffData></w:fldChar></w:r><w:r><w:fldChar w:fldCharType="end"/></w:r><w:bookmarkEnd w:id="{id}"/></w:p>"#
        )
    }

    fn template() -> Vec<u8> {
        let body = format!(
            r#"<w:p><w:r><w:t>Client: {{clientName}}</w:t></w:r></w:p><w:p><w:r><w:t>Due {{due}} for {{clientName}}</w:t></w:r></w:p>{}{}"#,
            checkbox("Check1", 1, 0),
            checkbox("Check2", 2, 0)
        );
        let document = format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        DocxPackage::from_parts([("[Content_Types].xml", CONTENT_TYPES.to_string()), ("word/document.xml", document)])
            .unwrap()
            .to_bytes()
            .unwrap()
    }

    fn schema() -> Schema {
        load_schema(Some(
            r#"{"properties": {
                "clientName": {"type": "string"},
                "critical": {"type": "boolean", "docx_mapping": {"type": "checkbox", "true_name": "Check1", "false_name": "Check2"}}
            }}"#,
        ))
        .unwrap()
    }

    #[test]
    fn test_placeholders_in_order() {
        assert_eq!(placeholders(&template()).unwrap(), vec!["clientName", "due"]);
    }

    #[test]
    fn test_placeholders_rejects_garbage() {
        assert!(placeholders(b"not a zip").is_err());
    }

    #[test]
    fn test_bookmarks_resolve_against_schema() {
        let values = load_values(Some(r#"{"critical": true}"#)).unwrap();
        let found = bookmarks(&template(), &schema(), &values).unwrap();
        assert_eq!(
            found,
            vec![
                BookmarkInfo {
                    bookmark: "Check1".to_string(),
                    field: Some("critical".to_string()),
                    checked: true,
                },
                BookmarkInfo {
                    bookmark: "Check2".to_string(),
                    field: Some("critical".to_string()),
                    checked: false,
                },
            ]
        );
    }

    #[test]
    fn test_validate_reports_duplicate_bookmarks() {
        let schema = load_schema(Some(
            r#"{"properties": {
                "a": {"type": "boolean", "docx_mapping": {"type": "checkbox", "name": "Check1"}},
                "b": {"type": "boolean", "docx_mapping": {"type": "checkbox", "name": "Check1"}}
            }}"#,
        ))
        .unwrap();
        assert_eq!(validate(&schema).len(), 1);
        assert!(validate(&self::schema()).is_empty());
    }

    #[test]
    fn test_fill_final_has_no_markers() {
        let source = MemorySource::new().with("t.docx", template());
        let values: FieldValues = [("clientName".to_string(), FieldValue::from("Acme"))].into_iter().collect();

        let bytes = tokio_test::block_on(fill(&source, "t.docx", schema(), values, RenderMode::Final)).unwrap();
        let text = DocxPackage::from_bytes(&bytes).unwrap().full_text().unwrap();

        assert!(text.contains("Client: Acme"));
        assert!(!text.contains("|||"));
        assert!(!text.contains("{due}"));
    }

    #[test]
    fn test_fill_missing_template() {
        let source = MemorySource::new();
        let result = tokio_test::block_on(fill(&source, "nope.docx", schema(), FieldValues::new(), RenderMode::Final));
        assert!(result.is_err());
    }

    #[test]
    fn test_preview_lines_show_controls() {
        let values: FieldValues = [("clientName".to_string(), FieldValue::from("Acme"))].into_iter().collect();
        let lines = preview(&template(), schema(), values, false).unwrap();

        assert_eq!(lines[0], "Client: [clientName=Acme]");
        assert!(lines[1].starts_with("Due [due="));
        assert!(lines[2].contains("[checkbox:Check1=☐]"));
    }
}

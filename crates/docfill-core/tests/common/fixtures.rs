//! In-memory DOCX fixtures

#![allow(dead_code)]

use docfill_core::package::MAIN_DOCUMENT_CONTENT_TYPE;
use docfill_core::DocxPackage;

pub const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"/></w:styles>"#;

fn content_types() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="{}"/></Types>"#,
        MAIN_DOCUMENT_CONTENT_TYPE
    )
}

fn document(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        body
    )
}

/// A paragraph holding one run of text
pub fn paragraph(text: &str) -> String {
    format!(r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#, text)
}

/// A paragraph whose text is split over several runs
pub fn split_paragraph(pieces: &[&str]) -> String {
    let runs: String = pieces
        .iter()
        .map(|p| format!(r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#, p))
        .collect();
    format!("<w:p>{}</w:p>", runs)
}

/// The form-field begin block of a legacy checkbox
pub fn checkbox_field(name: &str, default: u8) -> String {
    format!(
        r#"<w:fldChar w:fldCharType="begin"><w:ffData><w:name w:val="{name}"/><w:enabled/><w:calcOnExit w:val="0"/><w:checkBox><w:sizeAuto/><w:default w:val="{default}"/></w:checkBox></w:ffData></w:fldChar>"#,
        name = name,
        default = default
    )
}

/// A labelled legacy checkbox with its bookmark
pub fn checkbox_paragraph(name: &str, id: u32, default: u8, label: &str) -> String {
    format!(
        r#"<w:p><w:bookmarkStart w:id="{id}" w:name="{name}"/><w:r>{field}</w:r><w:r><w:instrText xml:space="preserve"> FORMCHECKBOX </w:instrText></w:r><w:r><w:fldChar w:fldCharType="separate"/></w:r><w:r><w:fldChar w:fldCharType="end"/></w:r><w:bookmarkEnd w:id="{id}"/><w:r><w:t xml:space="preserve"> {label}</w:t></w:r></w:p>"#,
        id = id,
        name = name,
        field = checkbox_field(name, default),
        label = label
    )
}

/// A complete DOCX archive with the given body and an optional header
pub fn docx(body: &str, header: Option<&str>) -> Vec<u8> {
    let mut parts = vec![
        ("[Content_Types].xml".to_string(), content_types()),
        ("word/document.xml".to_string(), document(body)),
        ("word/styles.xml".to_string(), STYLES.to_string()),
    ];
    if let Some(header) = header {
        parts.push((
            "word/header1.xml".to_string(),
            format!(
                r#"<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">{}</w:hdr>"#,
                header
            ),
        ));
    }
    DocxPackage::from_parts(parts)
        .expect("fixture package")
        .to_bytes()
        .expect("fixture bytes")
}

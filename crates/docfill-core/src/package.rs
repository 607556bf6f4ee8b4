//! DOCX container access
//!
//! A DOCX file is a ZIP archive of XML parts. [`DocxPackage`] keeps every
//! entry in its original order so a rewrite touches only the parts that were
//! replaced and copies the rest byte for byte.

use lazy_static::lazy_static;
use regex::Regex;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::DocfillError;
use crate::wordml;

pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Content type of the main document part of a regular document
pub const MAIN_DOCUMENT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const DEFAULT_MAIN_PART: &str = "word/document.xml";

lazy_static! {
    static ref OVERRIDE_ELEMENT: Regex = Regex::new(r"<Override\b[^>]*>").unwrap();
    static ref PART_NAME_ATTR: Regex = Regex::new(r#"\bPartName="([^"]*)""#).unwrap();
    static ref CONTENT_TYPE_ATTR: Regex = Regex::new(r#"\bContentType="([^"]*)""#).unwrap();
    static ref HEADER_FOOTER_PART: Regex = Regex::new(r"^word/(header|footer)\d*\.xml$").unwrap();
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

/// An opened DOCX archive
#[derive(Debug, Clone)]
pub struct DocxPackage {
    entries: Vec<Entry>,
    main_part: String,
}

impl DocxPackage {
    /// Open a package from raw archive bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocfillError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();
            let is_dir = file.is_dir();
            let mut data = Vec::new();
            if !is_dir {
                file.read_to_end(&mut data)
                    .map_err(|e| DocfillError::Container(format!("{}: {}", name, e)))?;
            }
            entries.push(Entry { name, data, is_dir });
        }

        Self::with_entries(entries)
    }

    /// Build a package from `(name, data)` pairs, mostly for tests and tools
    pub fn from_parts<N, D>(parts: impl IntoIterator<Item = (N, D)>) -> Result<Self, DocfillError>
    where
        N: Into<String>,
        D: Into<Vec<u8>>,
    {
        let entries = parts
            .into_iter()
            .map(|(name, data)| Entry {
                name: name.into(),
                data: data.into(),
                is_dir: false,
            })
            .collect();
        Self::with_entries(entries)
    }

    fn with_entries(entries: Vec<Entry>) -> Result<Self, DocfillError> {
        let content_types = entries
            .iter()
            .find(|e| e.name == CONTENT_TYPES_PART)
            .and_then(|e| std::str::from_utf8(&e.data).ok());

        let main_part = content_types
            .and_then(find_main_part)
            .filter(|name| entries.iter().any(|e| &e.name == name))
            .unwrap_or_else(|| DEFAULT_MAIN_PART.to_string());

        if !entries.iter().any(|e| e.name == main_part) {
            return Err(DocfillError::MissingPart(main_part));
        }

        tracing::debug!(parts = entries.len(), main = %main_part, "Opened DOCX package");
        Ok(Self { entries, main_part })
    }

    pub fn main_part_name(&self) -> &str {
        &self.main_part
    }

    /// Names of all file entries in archive order
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.name.as_str())
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name && !e.is_dir)
            .map(|e| e.data.as_slice())
    }

    pub fn part_text(&self, name: &str) -> Result<&str, DocfillError> {
        let data = self
            .part(name)
            .ok_or_else(|| DocfillError::MissingPart(name.to_string()))?;
        std::str::from_utf8(data).map_err(|_| DocfillError::InvalidEncoding(name.to_string()))
    }

    pub fn main_document(&self) -> Result<&str, DocfillError> {
        self.part_text(&self.main_part)
    }

    /// Parts that carry template tags: the main document, then headers and footers
    pub fn templated_parts(&self) -> Vec<String> {
        let mut parts = vec![self.main_part.clone()];
        parts.extend(
            self.part_names()
                .filter(|name| HEADER_FOOTER_PART.is_match(name))
                .map(str::to_string),
        );
        parts
    }

    /// Replace (or append) a part
    pub fn set_part(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        let data = data.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => {
                entry.data = data;
                entry.is_dir = false;
            }
            None => self.entries.push(Entry {
                name: name.to_string(),
                data,
                is_dir: false,
            }),
        }
    }

    /// Plain text of the main document, runs concatenated
    pub fn full_text(&self) -> Result<String, DocfillError> {
        Ok(wordml::full_text(self.main_document()?))
    }

    /// Serialize back into archive bytes, entries in their original order
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocfillError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            if entry.is_dir {
                writer.add_directory(entry.name.as_str(), options)?;
                continue;
            }
            writer.start_file(entry.name.as_str(), options)?;
            writer
                .write_all(&entry.data)
                .map_err(|e| DocfillError::Container(format!("{}: {}", entry.name, e)))?;
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}

/// Main part named by `[Content_Types].xml`, without the leading slash
fn find_main_part(content_types: &str) -> Option<String> {
    OVERRIDE_ELEMENT.find_iter(content_types).find_map(|m| {
        let element = m.as_str();
        let content_type = CONTENT_TYPE_ATTR.captures(element)?;
        let content_type = &content_type[1];
        if !(content_type.contains("wordprocessingml") && content_type.ends_with("main+xml")) {
            return None;
        }
        let part = PART_NAME_ATTR.captures(element)?;
        Some(part[1].trim_start_matches('/').to_string())
    })
}

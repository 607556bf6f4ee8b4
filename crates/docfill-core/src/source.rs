//! Template sources
//!
//! The editor is handed a location and asks a [`TemplateSource`] for the
//! bytes. The browser build fetches over HTTP; native callers read from disk
//! or memory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::SourceError;

#[async_trait(?Send)]
pub trait TemplateSource {
    /// Fetch the raw bytes of the template at `location`
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, SourceError>;
}

/// Reads templates from the filesystem, optionally confined to a root
#[derive(Debug, Clone, Default)]
pub struct FsSource {
    root: Option<PathBuf>,
}

impl FsSource {
    /// Resolve locations as given (relative to the working directory)
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Resolve locations under `root`; escaping it is rejected
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, location: &str) -> Result<PathBuf, SourceError> {
        let Some(root) = &self.root else {
            return Ok(PathBuf::from(location));
        };

        if location.split(['/', '\\']).any(|part| part == "..") {
            return Err(SourceError::PathSecurityViolation(
                "Path traversal with '..' is not allowed".to_string(),
            ));
        }
        if Path::new(location).is_absolute() {
            return Err(SourceError::PathSecurityViolation(
                "Absolute paths are not allowed in a rooted source".to_string(),
            ));
        }
        Ok(root.join(location))
    }
}

#[async_trait(?Send)]
impl TemplateSource for FsSource {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, SourceError> {
        let path = self.resolve(location)?;
        match std::fs::read(&path) {
            Ok(bytes) => {
                tracing::debug!(path = %path.display(), bytes = bytes.len(), "Read template");
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(SourceError::Io(e)),
        }
    }
}

/// Templates held in memory, keyed by location
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.documents.insert(location.into(), bytes.into());
    }

    pub fn with(mut self, location: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(location, bytes);
        self
    }
}

#[async_trait(?Send)]
impl TemplateSource for MemorySource {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, SourceError> {
        self.documents
            .get(location)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(location.to_string()))
    }
}

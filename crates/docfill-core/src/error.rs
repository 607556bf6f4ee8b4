use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocfillError {
    #[error("Failed to read document container: {0}")]
    Container(String),

    #[error("Missing document part: {0}")]
    MissingPart(String),

    #[error("Part '{0}' is not valid UTF-8")]
    InvalidEncoding(String),

    #[error("Malformed document XML: {0}")]
    Xml(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Preview renderer failed: {0}")]
    Renderer(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("No document loaded")]
    NotLoaded,

    #[error("Session is closed")]
    Closed,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Preview binding failed: {0}")]
    Bind(#[from] BindError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<zip::result::ZipError> for DocfillError {
    fn from(err: zip::result::ZipError) -> Self {
        DocfillError::Container(err.to_string())
    }
}

/// Errors raised while obtaining template bytes
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Path security violation: {0}")]
    PathSecurityViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a preview DOM implementation
#[derive(Error, Debug)]
pub enum BindError {
    #[error("DOM operation failed: {0}")]
    Dom(String),

    #[error("Node is detached from the preview tree")]
    Detached,
}

//! Shared data structures
//!
//! These structs represent the data model that flows between
//! the caller, the ingestion pipeline and the object store.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Content type used when sniffing cannot identify a file
pub const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

/// A raw file handed to the pipeline by the caller
///
/// The bytes are shared, so cloning a `SourceFile` never copies the payload.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Original filename only (e.g., "stop_sign.PNG")
    pub name: String,
    /// Declared MIME type (e.g., "image/png")
    pub content_type: String,
    /// Raw, undecoded file content
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Build a source file, declaring its content type from the leading magic bytes
    pub fn sniffed(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let content_type = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| UNKNOWN_CONTENT_TYPE.to_string());
        Self::new(name, content_type, bytes)
    }

    /// Read a file from disk
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Ok(Self::sniffed(name, bytes))
    }

    /// Whether the declared content type is an image type
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    /// Suffix after the last `.` of the original name, case preserved
    pub fn extension(&self) -> &str {
        crate::ingest::naming::file_extension(&self.name)
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Represents a single image in the library folder of the bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryImage {
    /// Object name inside the library folder (e.g., "R001.png")
    pub name: String,
    /// Full storage path (e.g., "library/R001.png")
    pub path: String,
    /// Publicly reachable URL of the object
    pub public_url: String,
}

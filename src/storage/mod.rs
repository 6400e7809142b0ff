//! Object storage
//!
//! The pipeline only needs three things from a storage backend: write an
//! object (optionally overwriting), list a folder, and turn a path into a
//! public URL. [`ObjectStore`] is that seam; two backends implement it:
//! - [`SqliteStore`]: blobs in a local SQLite catalog (sqlite.rs)
//! - [`MemoryStore`]: an in-process map for dry runs and tests (memory.rs)

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database operation error (wraps rusqlite::Error)
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Object exists and the write did not allow overwriting
    #[error("Object already exists: {0}")]
    Conflict(String),

    /// Write would exceed the configured storage quota
    #[error("Storage quota exceeded: {used} + {requested} bytes > {limit} bytes")]
    Quota { used: u64, requested: u64, limit: u64 },

    /// Path is empty or malformed
    #[error("Invalid object path: {0:?}")]
    InvalidPath(String),

    /// Backend cannot be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Background task failed
    #[error("Task join error: {0}")]
    Join(String),
}

/// Options for [`ObjectStore::put`]
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Replace an existing object at the same path
    pub overwrite: bool,
    pub content_type: Option<String>,
}

impl PutOptions {
    /// Overwrite-if-exists, used for library uploads so retries are safe
    pub fn upsert(content_type: impl Into<String>) -> Self {
        Self {
            overwrite: true,
            content_type: Some(content_type.into()),
        }
    }

    /// Fail if the path is taken
    pub fn create(content_type: impl Into<String>) -> Self {
        Self {
            overwrite: false,
            content_type: Some(content_type.into()),
        }
    }
}

/// Sort order for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NameAsc,
    NameDesc,
}

/// Options for [`ObjectStore::list`]
#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    pub limit: usize,
    pub sort: SortOrder,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: 100,
            sort: SortOrder::NameAsc,
        }
    }
}

/// Result of a successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
    pub public_url: String,
}

/// One entry of a folder listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Name relative to the listed folder
    pub name: String,
    pub size: u64,
}

/// A bucket of objects addressed by slash-separated paths
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` at `path`
    async fn put(
        &self,
        path: &str,
        bytes: Arc<[u8]>,
        options: PutOptions,
    ) -> Result<StoredObject, StorageError>;

    /// List the direct children of the folder `prefix` ("" for the bucket root)
    async fn list(&self, prefix: &str, options: ListOptions)
        -> Result<Vec<ObjectEntry>, StorageError>;

    /// Public URL of `path`; deterministic and free of I/O
    fn public_url(&self, path: &str) -> String;
}

/// Builds public URLs the way the hosted storage service lays them out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicUrls {
    base_url: String,
    bucket: String,
}

impl PublicUrls {
    pub fn new(base_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `<base>/storage/v1/object/public/<bucket>/<path>`
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}

/// Check an object path and split it into `(folder, name)`
pub(crate) fn split_path(path: &str) -> Result<(&str, &str), StorageError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() || trimmed.split('/').any(|segment| segment.is_empty()) {
        return Err(StorageError::InvalidPath(path.to_string()));
    }

    Ok(match trimmed.rfind('/') {
        Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
        None => ("", trimmed),
    })
}

/// Path of `name` inside `folder`; an empty folder means the bucket root
pub fn join_path(folder: &str, name: &str) -> String {
    let folder = normalize_prefix(folder);
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", folder, name)
    }
}

/// Normalize a folder prefix the same way [`split_path`] normalizes folders
pub(crate) fn normalize_prefix(prefix: &str) -> &str {
    prefix.trim_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_layout() {
        let urls = PublicUrls::new("https://example.supabase.co/", "sign-icons");
        assert_eq!(
            urls.url_for("library/R001.png"),
            "https://example.supabase.co/storage/v1/object/public/sign-icons/library/R001.png"
        );
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("library/R001.png").unwrap(), ("library", "R001.png"));
        assert_eq!(split_path("/a/b/c.png").unwrap(), ("a/b", "c.png"));
        assert_eq!(split_path("root.png").unwrap(), ("", "root.png"));
        assert!(split_path("").is_err());
        assert!(split_path("library//R001.png").is_err());
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("library", "R001.png"), "library/R001.png");
        assert_eq!(join_path("/icons/", "R001.png"), "icons/R001.png");
        assert_eq!(join_path("", "R001.png"), "R001.png");
    }

    #[test]
    fn test_put_option_presets() {
        assert!(PutOptions::upsert("image/png").overwrite);
        assert!(!PutOptions::create("image/png").overwrite);
    }
}

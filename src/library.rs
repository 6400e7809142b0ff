//! Library operations
//!
//! Everything the dashboard does with the icon library outside of bulk
//! ingestion: listing what is already stored, uploading one icon for a sign,
//! and keeping a sign's ordered list of icon URLs free of duplicates.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::state::data::{LibraryImage, SourceFile};
use crate::storage::{join_path, ListOptions, ObjectStore, PutOptions, SortOrder, StorageError};

/// Extensions shown in the library browser
const LIBRARY_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Single upload errors
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Not an image: {0} ({1})")]
    NotAnImage(String, String),

    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    /// The sign already references this URL
    #[error("Duplicate icon: {0}")]
    Duplicate(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Whether a library object name looks like a browsable image
pub fn is_library_image(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => LIBRARY_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        None => false,
    }
}

/// List the images in the library folder, sorted by name
pub async fn list_library(
    store: &dyn ObjectStore,
    config: &Config,
) -> Result<Vec<LibraryImage>, StorageError> {
    let options = ListOptions {
        limit: config.list_limit,
        sort: SortOrder::NameAsc,
    };
    let entries = store.list(&config.library_prefix, options).await?;

    let images: Vec<LibraryImage> = entries
        .into_iter()
        .filter(|entry| is_library_image(&entry.name))
        .map(|entry| {
            let path = join_path(&config.library_prefix, &entry.name);
            LibraryImage {
                public_url: store.public_url(&path),
                path,
                name: entry.name,
            }
        })
        .collect();

    tracing::debug!(count = images.len(), "Listed library images");
    Ok(images)
}

/// Upload one icon to the bucket root under a fresh unique name
///
/// Returns the public URL of the stored object. `existing` is the sign's
/// current icon list; a URL already in it is refused before anything is
/// written.
pub async fn upload_single(
    store: &dyn ObjectStore,
    config: &Config,
    file: &SourceFile,
    existing: &IconSet,
) -> Result<String, UploadError> {
    if !file.is_image() {
        return Err(UploadError::NotAnImage(file.name.clone(), file.content_type.clone()));
    }

    let size = file.len() as u64;
    if size > config.max_upload_bytes {
        return Err(UploadError::TooLarge {
            size,
            limit: config.max_upload_bytes,
        });
    }

    upload_as(store, file, existing, &unique_name(file.extension())).await
}

/// Store `file` at `path` unless the sign already references its URL
async fn upload_as(
    store: &dyn ObjectStore,
    file: &SourceFile,
    existing: &IconSet,
    path: &str,
) -> Result<String, UploadError> {
    let url = store.public_url(path);
    if existing.contains(&url) {
        return Err(UploadError::Duplicate(url));
    }

    let stored = store
        .put(
            path,
            Arc::clone(&file.bytes),
            PutOptions::create(file.content_type.clone()),
        )
        .await?;

    tracing::info!(file = %file.name, path = %stored.path, "✅ Uploaded icon");
    Ok(stored.public_url)
}

/// `<unix millis>-<6 base36 chars>.<ext>`
fn unique_name(extension: &str) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();

    format!(
        "{}-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        suffix,
        extension
    )
}

/// Ordered icon URLs of one sign, without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IconSet {
    urls: Vec<String>,
}

impl IconSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored URLs, dropping repeats but keeping first positions
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for url in urls {
            set.add(url);
        }
        set
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.iter().any(|u| u == url)
    }

    /// Append a URL; returns false if it was already present
    pub fn add(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.contains(&url) {
            return false;
        }
        self.urls.push(url);
        true
    }

    /// Remove a URL; returns false if it was not present
    pub fn remove(&mut self, url: &str) -> bool {
        let before = self.urls.len();
        self.urls.retain(|u| u != url);
        self.urls.len() != before
    }

    /// Move the icon at `from` to position `to`
    pub fn move_icon(&mut self, from: usize, to: usize) -> bool {
        if from >= self.urls.len() || to >= self.urls.len() {
            return false;
        }
        let url = self.urls.remove(from);
        self.urls.insert(to, url);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

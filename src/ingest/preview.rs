//! Preview thumbnails for staged images
//!
//! While a batch waits for confirmation, every image gets a small PNG
//! thumbnail in the preview cache directory. A [`PreviewHandle`] owns that
//! file: releasing the handle deletes it. Handles release themselves on drop,
//! so cancelled or failed batches never leave thumbnails behind.

use image::{imageops::FilterType, DynamicImage, ImageFormat};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Preview generation errors
#[derive(Debug, Error)]
pub enum PreviewError {
    /// Thumbnail could not be encoded or written
    #[error("Failed to save preview {0}: {1}")]
    Save(PathBuf, #[source] image::ImageError),
}

#[derive(Debug)]
struct CacheInner {
    dir: PathBuf,
    size: u32,
    /// Distinguishes this cache's files from other caches sharing the directory
    nonce: u32,
    next_id: AtomicU64,
    live: Mutex<HashSet<u64>>,
}

/// Issues preview handles and tracks which are still live
#[derive(Debug, Clone)]
pub struct PreviewCache {
    inner: Arc<CacheInner>,
}

impl PreviewCache {
    /// Create a cache writing thumbnails of at most `size` pixels into `dir`
    pub fn new(dir: impl Into<PathBuf>, size: u32) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        Ok(Self {
            inner: Arc::new(CacheInner {
                dir,
                size: size.max(1),
                nonce: rand::random(),
                next_id: AtomicU64::new(1),
                live: Mutex::new(HashSet::new()),
            }),
        })
    }

    /// Directory holding the thumbnails
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Number of handles not yet released
    pub fn live_count(&self) -> usize {
        self.inner
            .live
            .lock()
            .map(|live| live.len())
            .unwrap_or_default()
    }

    /// Resize `img` to thumbnail size, save it and hand out a handle to it
    pub fn create(&self, img: &DynamicImage) -> Result<PreviewHandle, PreviewError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let path = self
            .inner
            .dir
            .join(format!("preview-{:08x}-{}.png", self.inner.nonce, id));

        let thumbnail = if img.width() > self.inner.size || img.height() > self.inner.size {
            img.resize(self.inner.size, self.inner.size, FilterType::Triangle)
        } else {
            img.clone()
        };

        // PNG keeps the alpha channel that JPEG would reject
        thumbnail
            .to_rgba8()
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| PreviewError::Save(path.clone(), e))?;

        if let Ok(mut live) = self.inner.live.lock() {
            live.insert(id);
        }

        tracing::debug!(preview = %path.display(), "📸 Generated preview");

        Ok(PreviewHandle {
            id,
            path,
            cache: Arc::clone(&self.inner),
            released: AtomicBool::new(false),
        })
    }
}

/// A revocable reference to one preview thumbnail
#[derive(Debug)]
pub struct PreviewHandle {
    id: u64,
    path: PathBuf,
    cache: Arc<CacheInner>,
    released: AtomicBool,
}

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Location of the thumbnail file while the handle is live
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Delete the thumbnail
    ///
    /// Returns `true` only for the call that actually released the handle;
    /// later calls are no-ops.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(preview = %self.path.display(), error = %e, "Failed to remove preview");
            }
        }

        if let Ok(mut live) = self.cache.live.lock() {
            live.remove(&self.id);
        }
        true
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.release();
    }
}

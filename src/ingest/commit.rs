//! Commit pipeline
//!
//! Uploads a confirmed batch to the library folder of the object store.
//! Items are written one at a time, in staging order, with overwrite enabled
//! so a failed batch can simply be committed again. A failing item is
//! recorded and the loop moves on; earlier uploads are never rolled back.

use serde::Serialize;
use std::sync::Arc;

use super::stage::StagedAsset;
use crate::color::ColorCode;
use crate::config::Config;
use crate::storage::{join_path, ObjectStore, PutOptions};

/// One asset that reached the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSuccess {
    pub original_name: String,
    pub final_name: String,
    pub color: ColorCode,
    pub path: String,
    pub public_url: String,
}

/// One asset that did not
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitFailure {
    pub original_name: String,
    pub final_name: String,
    pub reason: String,
}

/// Outcome of committing a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub attempted: usize,
    pub succeeded: Vec<CommitSuccess>,
    pub failed: Vec<CommitFailure>,
}

impl CommitReport {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Every attempted asset made it
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Assigned names worth committing again
    pub fn retry_candidates(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.final_name.as_str()).collect()
    }
}

/// Writes staged batches to the library folder
#[derive(Clone)]
pub struct Committer {
    store: Arc<dyn ObjectStore>,
    library_prefix: String,
}

impl Committer {
    pub fn new(store: Arc<dyn ObjectStore>, library_prefix: impl Into<String>) -> Self {
        Self {
            store,
            library_prefix: library_prefix.into(),
        }
    }

    pub fn from_config(store: Arc<dyn ObjectStore>, config: &Config) -> Self {
        Self::new(store, config.library_prefix.clone())
    }

    /// Storage path for an assigned name
    pub fn path_for(&self, assigned_name: &str) -> String {
        join_path(&self.library_prefix, assigned_name)
    }

    /// Upload every asset in order, then release all their previews
    ///
    /// Never fails as a whole: per-item errors end up in
    /// [`CommitReport::failed`].
    pub async fn commit(&self, batch: &[StagedAsset]) -> CommitReport {
        let total = batch.len();
        let mut report = CommitReport::default();

        for (i, asset) in batch.iter().enumerate() {
            report.attempted += 1;

            let path = self.path_for(asset.assigned_name());
            let source = asset.source();
            let options = PutOptions::upsert(source.content_type.clone());

            match self.store.put(&path, Arc::clone(&source.bytes), options).await {
                Ok(stored) => {
                    tracing::info!("✅ Uploaded {}/{}: {}", i + 1, total, asset.assigned_name());
                    report.succeeded.push(CommitSuccess {
                        original_name: source.name.clone(),
                        final_name: asset.assigned_name().to_string(),
                        color: asset.color(),
                        path: stored.path,
                        public_url: stored.public_url,
                    });
                }
                Err(e) => {
                    tracing::error!(
                        file = %source.name,
                        path = %path,
                        error = %e,
                        "Error uploading {}/{}",
                        i + 1,
                        total
                    );
                    report.failed.push(CommitFailure {
                        original_name: source.name.clone(),
                        final_name: asset.assigned_name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let released = super::stage::release_all(batch);
        tracing::info!(
            attempted = report.attempted,
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            released,
            "Commit complete"
        );

        report
    }
}

impl std::fmt::Debug for Committer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Committer")
            .field("library_prefix", &self.library_prefix)
            .finish()
    }
}

//! Staging pipeline
//!
//! Turns a batch of uploaded files into named, previewable candidates:
//! - Non-image files are skipped and counted
//! - Each image is decoded, sampled and classified, and gets a preview
//! - Names are allocated in input order from one counter table per batch
//!
//! Analysis of different files runs concurrently on the blocking pool.
//! Results are consumed in input order by a single loop that owns the
//! counter table, so the same input order always yields the same names.

use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::decode;
use super::naming::ColorCounterTable;
use super::preview::{PreviewCache, PreviewError, PreviewHandle};
use super::sampler::{self, SampleError};
use crate::color::{ColorCode, Rgb};
use crate::config::{Config, SamplingConfig};
use crate::state::data::SourceFile;

/// Staging errors
///
/// Everything except `Cancelled` is contained to one file and reported in
/// [`StageReport::failures`].
#[derive(Debug, Error)]
pub enum StageError {
    /// File content could not be decoded as an image
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Decoded pixels could not be sampled
    #[error("Failed to sample color: {0}")]
    Sample(#[from] SampleError),

    /// Preview thumbnail could not be created
    #[error("Failed to create preview: {0}")]
    Preview(#[from] PreviewError),

    /// Background task panicked or was aborted
    #[error("Task join error: {0}")]
    Join(String),

    /// Batch was abandoned before it finished staging
    #[error("Staging cancelled")]
    Cancelled,
}

/// A file that is ready to be committed under its assigned name
#[derive(Debug)]
pub struct StagedAsset {
    source: SourceFile,
    preview: PreviewHandle,
    sample: Rgb,
    color: ColorCode,
    assigned_name: String,
}

impl StagedAsset {
    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    pub fn original_name(&self) -> &str {
        &self.source.name
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    /// Dominant color the classification was based on
    pub fn sample(&self) -> Rgb {
        self.sample
    }

    pub fn color(&self) -> ColorCode {
        self.color
    }

    /// `<color><counter>.<ext>`, e.g. `R001.png`
    pub fn assigned_name(&self) -> &str {
        &self.assigned_name
    }

    /// Release this asset's preview; safe to call repeatedly
    pub fn release(&self) -> bool {
        self.preview.release()
    }
}

/// A file that was an image but could not be staged
#[derive(Debug)]
pub struct StageFailure {
    pub file_name: String,
    pub reason: StageError,
}

/// Result of staging one batch
#[derive(Debug, Default)]
pub struct StageReport {
    /// Staged assets, in input order
    pub staged: Vec<StagedAsset>,
    /// Names of inputs that were not images
    pub skipped: Vec<String>,
    /// Images that failed to decode, sample or preview
    pub failures: Vec<StageFailure>,
}

impl StageReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Release every preview, e.g. when the user cancels the batch
    pub fn release_all(&self) -> usize {
        release_all(&self.staged)
    }
}

/// Release every preview in `staged`
///
/// Returns how many previews this call actually released; calling it again
/// releases nothing and returns 0.
pub fn release_all(staged: &[StagedAsset]) -> usize {
    staged.iter().filter(|asset| asset.release()).count()
}

/// Group staged assets by color code, in code order
pub fn group_by_color(staged: &[StagedAsset]) -> BTreeMap<ColorCode, Vec<&StagedAsset>> {
    let mut groups: BTreeMap<ColorCode, Vec<&StagedAsset>> = BTreeMap::new();
    for asset in staged {
        groups.entry(asset.color).or_default().push(asset);
    }
    groups
}

/// Select one color group, or every asset when `color` is `None`
pub fn filter_by_color(staged: &[StagedAsset], color: Option<ColorCode>) -> Vec<&StagedAsset> {
    staged
        .iter()
        .filter(|asset| color.map_or(true, |c| asset.color == c))
        .collect()
}

/// Outcome of analyzing one image
struct Analysis {
    sample: Rgb,
    color: ColorCode,
    preview: PreviewHandle,
}

/// Runs staging batches
#[derive(Debug, Clone)]
pub struct Stager {
    previews: PreviewCache,
    sampling: SamplingConfig,
    concurrency: usize,
}

impl Stager {
    pub fn new(previews: PreviewCache, sampling: SamplingConfig, concurrency: usize) -> Self {
        Self {
            previews,
            sampling,
            concurrency: concurrency.max(1),
        }
    }

    /// Build a stager from configuration, creating the preview directory
    pub fn from_config(config: &Config) -> std::io::Result<Self> {
        let previews = PreviewCache::new(&config.preview_dir, config.preview_size)?;
        Ok(Self::new(previews, config.sampling, config.stage_concurrency))
    }

    pub fn previews(&self) -> &PreviewCache {
        &self.previews
    }

    /// Stage a batch of files
    ///
    /// Per-file problems never abort the batch. The only error is
    /// [`StageError::Cancelled`], after which no preview from this call is
    /// left live.
    pub async fn stage(
        &self,
        files: Vec<SourceFile>,
        cancel: &CancellationToken,
    ) -> Result<StageReport, StageError> {
        let total = files.len();
        let mut report = StageReport::default();

        let mut images = Vec::with_capacity(total);
        for file in files {
            if file.is_image() {
                images.push(file);
            } else {
                tracing::info!(file = %file.name, content_type = %file.content_type, "Skipped: not an image");
                report.skipped.push(file.name);
            }
        }

        let mut analyses = stream::iter(images.into_iter().map(|file| {
            let previews = self.previews.clone();
            let sampling = self.sampling;
            async move {
                let result = analyze(Arc::clone(&file.bytes), sampling, previews).await;
                (file, result)
            }
        }))
        .buffered(self.concurrency);

        // One table per batch, touched only by this loop
        let mut counters = ColorCounterTable::new();
        let mut processed = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = analyses.next() => Some(next),
            };

            let Some(next) = next else {
                let released = report.release_all();
                tracing::info!(
                    staged = report.staged.len(),
                    released,
                    "Staging cancelled, previews released"
                );
                return Err(StageError::Cancelled);
            };

            let Some((file, result)) = next else {
                break;
            };
            processed += 1;

            match result {
                Ok(analysis) => {
                    let assigned_name = counters.allocate(analysis.color, file.extension());
                    tracing::info!(
                        "✅ Processed {}/{}: {} → {} ({:?})",
                        processed,
                        total,
                        file.name,
                        assigned_name,
                        analysis.sample
                    );
                    report.staged.push(StagedAsset {
                        source: file,
                        preview: analysis.preview,
                        sample: analysis.sample,
                        color: analysis.color,
                        assigned_name,
                    });
                }
                Err(reason) => {
                    tracing::warn!(file = %file.name, error = %reason, "Could not stage image");
                    report.failures.push(StageFailure {
                        file_name: file.name,
                        reason,
                    });
                }
            }
        }

        tracing::info!(
            staged = report.staged.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "Staging complete"
        );

        Ok(report)
    }
}

/// Decode, sample, classify and preview one file off the async executor
async fn analyze(
    bytes: Arc<[u8]>,
    sampling: SamplingConfig,
    previews: PreviewCache,
) -> Result<Analysis, StageError> {
    tokio::task::spawn_blocking(move || analyze_blocking(&bytes, sampling, &previews))
        .await
        .map_err(|e| StageError::Join(e.to_string()))?
}

fn analyze_blocking(
    bytes: &[u8],
    sampling: SamplingConfig,
    previews: &PreviewCache,
) -> Result<Analysis, StageError> {
    // Decode once, then derive both the sample and the preview from it
    let img = decode::decode_image(bytes)?;

    let bounded = decode::bounded_rgba(&img, sampling.max_dimension);
    let sample = sampler::dominant_color_of(&bounded, sampling.mode, sampling.step)?;
    let color = sample.classify();

    let preview = previews.create(&img)?;

    Ok(Analysis {
        sample,
        color,
        preview,
    })
}

//! Bulk ingestion pipeline
//!
//! A batch moves through two phases:
//! - `stage`: classify every image by dominant color, allocate its name and
//!   build a preview for review
//! - `commit`: upload the confirmed batch to the library folder
//!
//! The remaining modules are the building blocks those phases share.

pub mod commit;
pub mod decode;
pub mod naming;
pub mod preview;
pub mod sampler;
pub mod scan;
pub mod stage;

pub use commit::{CommitFailure, CommitReport, CommitSuccess, Committer};
pub use scan::{scan_folder, ScanResult};
pub use stage::{
    filter_by_color, group_by_color, release_all, StageError, StageFailure, StageReport,
    StagedAsset, Stager,
};

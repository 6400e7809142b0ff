//! Color-categorized image ingestion for the road-sign learning dashboard.
//!
//! Uploaded images are sampled for their dominant color, classified into one
//! of seven color codes, renamed `<code><NNN>.<ext>` and, once confirmed,
//! written to the library folder of an object store.

pub mod color;
pub mod config;
pub mod ingest;
pub mod library;
pub mod state;
pub mod storage;

pub use color::{classify, ColorCode, Rgb};
pub use config::Config;
pub use ingest::{CommitReport, Committer, StageReport, StagedAsset, Stager};
pub use state::data::{LibraryImage, SourceFile};
pub use storage::{MemoryStore, ObjectStore, PublicUrls, SqliteStore};

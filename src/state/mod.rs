//! Shared state
//!
//! This module holds the data structures that flow between the CLI,
//! the ingestion pipeline and the object store:
//! - Source files handed in by the caller (data.rs)
//! - Library listings (data.rs)

pub mod data;

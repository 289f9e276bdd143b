//! Download module for document content.
//!
//! This module provides:
//! - Streaming, integrity-checked single downloads
//! - Bounded concurrent batch downloads
//! - Collection downloads in three layouts
//! - Download statistics

pub mod collection;
pub mod engine;
pub mod state;

pub use collection::CollectionDownloadOptions;
pub use engine::{
    DownloadEngine, DownloadOptions, DownloadOutcome, DownloadRequest, ProgressFactory,
};
pub use state::DownloadStats;

//! Filesystem module.
//!
//! Provides:
//! - Filename sanitizing and collision naming
//! - Download directory management

pub mod naming;
pub mod paths;

pub use naming::{collision_candidates, numbered_filename, sanitize_filename};
pub use paths::{collection_directory_name, ensure_dir, nested_directory};

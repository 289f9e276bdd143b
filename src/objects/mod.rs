//! Lazily resolved object model.
//!
//! This module provides:
//! - The single-flight object registry
//! - Collection tree traversal with back-reference detection

pub mod registry;
pub mod tree;

pub use registry::{ObjectRegistry, DEFAULT_MAX_CONCURRENT_FETCHES};
pub use tree::{build_tree, CollectionTreeNode};

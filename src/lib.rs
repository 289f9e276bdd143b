//! docushare-dl - browse and download content from Xerox DocuShare sites
//!
//! DocuShare exposes no data API, only server-rendered HTML pages. This
//! library logs in through the site's challenge-response form, builds typed
//! objects from property, history and listing pages, walks collection
//! hierarchies (which may contain cycles) and streams document content to disk.
//!
//! # Features
//!
//! - Challenge-response login with transparent re-login after session loss
//! - Single-flight object cache keyed by handle
//! - Collection trees with back-reference detection
//! - Atomic, integrity-checked downloads with collision-free naming
//! - Collection downloads as direct children, flattened, or mirrored tree
//! - Retry with exponential backoff for transient network failures
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use docushare_dl::{DocuShare, DownloadOptions, Handle};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ds = DocuShare::new("https://docushare.example.com/docushare/")?;
//!     ds.login_with_password("alice", "secret").await?;
//!
//!     let handle: Handle = "Document-20202".parse()?;
//!     let object = ds.object(&handle).await?;
//!     println!("{}", object.title());
//!
//!     let path = ds
//!         .download(&handle, Path::new("."), &DownloadOptions::default(), None)
//!         .await?;
//!     println!("saved to {}", path.display());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod fs;
pub mod html;
pub mod model;
pub mod objects;
pub mod output;

// Re-exports for convenience
pub use api::{SessionState, Transport};
pub use auth::{CredentialSource, Credentials, ScriptEvaluator};
pub use client::{credential_source, DocuShare, DocuShareBuilder};
pub use config::{Config, DownloadLayout, PasswordSource};
pub use download::{CollectionDownloadOptions, DownloadOptions, DownloadOutcome, DownloadRequest};
pub use error::{Error, Result};
pub use html::{PageClassifier, PageKind};
pub use model::{
    CollectionObject, DocuShareObject, DocumentObject, Handle, HandleType, VersionObject,
};
pub use objects::CollectionTreeNode;
pub use output::ProgressSink;

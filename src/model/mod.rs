//! Object model of a DocuShare site.
//!
//! Provides:
//! - Typed handles
//! - Documents, versions and collections built from parsed pages

pub mod handle;
pub mod object;

pub use handle::{Handle, HandleType};
pub use object::{CollectionObject, DocuShareObject, DocumentObject, ObjectInfo, VersionObject};

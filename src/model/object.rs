//! Typed DocuShare objects built from parsed pages.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::model::handle::{Handle, HandleType};

/// Fields shared by every DocuShare object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Handle naming this object.
    pub handle: Handle,

    /// Title shown on the properties page.
    pub title: String,

    /// Every label/value pair of the properties page, known or not.
    pub properties: HashMap<String, String>,

    /// When the properties were fetched.
    pub fetched_at: DateTime<Utc>,
}

impl ObjectInfo {
    /// Raw property value by label.
    pub fn property(&self, label: &str) -> Option<&str> {
        self.properties.get(label).map(String::as_str)
    }
}

/// A Document and its version history.
#[derive(Debug, Clone)]
pub struct DocumentObject {
    pub info: ObjectInfo,

    /// File name suggested by the site.
    pub filename: String,

    /// Document control number, when the site defines one.
    pub document_control_number: Option<String>,

    /// Version handles, most recent first.
    pub version_handles: Vec<Handle>,

    /// Most recent version, if the history lists any.
    pub current_version_handle: Option<Handle>,
}

/// One immutable snapshot of a Document.
#[derive(Debug, Clone)]
pub struct VersionObject {
    pub info: ObjectInfo,

    /// File name of this version.
    pub filename: String,

    /// Sequential version number (1-based).
    pub version_number: u32,

    /// Document this version belongs to, when the page links it.
    pub document_handle: Option<Handle>,
}

/// A container whose listing enumerates child handles.
#[derive(Debug, Clone)]
pub struct CollectionObject {
    pub info: ObjectInfo,

    /// Immediate children in site-rendered order.
    pub child_handles: Vec<Handle>,
}

impl CollectionObject {
    /// Child documents, in listing order.
    pub fn documents(&self) -> impl Iterator<Item = &Handle> {
        self.child_handles.iter().filter(|h| h.is_document())
    }

    /// Child collections, in listing order.
    pub fn collections(&self) -> impl Iterator<Item = &Handle> {
        self.child_handles.iter().filter(|h| h.is_collection())
    }
}

/// Any object resolved through the registry.
#[derive(Debug, Clone)]
pub enum DocuShareObject {
    Document(DocumentObject),
    Version(VersionObject),
    Collection(CollectionObject),
}

impl DocuShareObject {
    pub fn info(&self) -> &ObjectInfo {
        match self {
            DocuShareObject::Document(doc) => &doc.info,
            DocuShareObject::Version(ver) => &ver.info,
            DocuShareObject::Collection(col) => &col.info,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.info().handle
    }

    pub fn kind(&self) -> HandleType {
        self.handle().kind()
    }

    pub fn title(&self) -> &str {
        &self.info().title
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.info().properties
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.info().fetched_at
    }

    /// File name for Documents and Versions.
    pub fn filename(&self) -> Option<&str> {
        match self {
            DocuShareObject::Document(doc) => Some(&doc.filename),
            DocuShareObject::Version(ver) => Some(&ver.filename),
            DocuShareObject::Collection(_) => None,
        }
    }

    pub fn as_document(&self) -> Option<&DocumentObject> {
        match self {
            DocuShareObject::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_version(&self) -> Option<&VersionObject> {
        match self {
            DocuShareObject::Version(ver) => Some(ver),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&CollectionObject> {
        match self {
            DocuShareObject::Collection(col) => Some(col),
            _ => None,
        }
    }
}

impl fmt::Display for DocuShareObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocuShareObject::Document(doc) => {
                write!(
                    f,
                    "handle: \"{}\", title: \"{}\", filename: \"{}\"",
                    doc.info.handle, doc.info.title, doc.filename
                )?;
                if let Some(dcn) = &doc.document_control_number {
                    write!(f, ", document_control_number: \"{}\"", dcn)?;
                }
                Ok(())
            }
            DocuShareObject::Version(ver) => write!(
                f,
                "handle: \"{}\", title: \"{}\", filename: \"{}\", version_number: {}",
                ver.info.handle, ver.info.title, ver.filename, ver.version_number
            ),
            DocuShareObject::Collection(col) => write!(
                f,
                "handle: \"{}\", title: \"{}\", children: {}",
                col.info.handle,
                col.info.title,
                col.child_handles.len()
            ),
        }
    }
}

//! DocuShare handles such as `Collection-10101`, `Document-20202` and `Version-123456`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Kind of object a handle names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandleType {
    Collection,
    Document,
    Version,
}

impl HandleType {
    /// All handle types, in the order they are tried when parsing.
    pub const ALL: [HandleType; 3] = [
        HandleType::Collection,
        HandleType::Document,
        HandleType::Version,
    ];

    /// Canonical prefix used in handle strings and URLs.
    pub fn identifier(&self) -> &'static str {
        match self {
            HandleType::Collection => "Collection",
            HandleType::Document => "Document",
            HandleType::Version => "Version",
        }
    }
}

impl fmt::Display for HandleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Typed identifier of one object on a DocuShare site.
///
/// The numeric part is kept as the original digit string so that a handle
/// written with leading zeros round-trips unchanged into URLs. Equality,
/// hashing and ordering use the numeric value, so `Document-042` and
/// `Document-42` name the same object.
#[derive(Debug, Clone)]
pub struct Handle {
    kind: HandleType,
    id: String,
}

impl Handle {
    /// Build a handle from its parts. `id` must be a non-empty run of ASCII digits.
    pub fn new(kind: HandleType, id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidHandle(format!("{}-{}", kind, id)));
        }
        Ok(Self { kind, id })
    }

    pub fn collection(id: impl Into<String>) -> Result<Self> {
        Self::new(HandleType::Collection, id)
    }

    pub fn document(id: impl Into<String>) -> Result<Self> {
        Self::new(HandleType::Document, id)
    }

    pub fn version(id: impl Into<String>) -> Result<Self> {
        Self::new(HandleType::Version, id)
    }

    /// Handle type.
    pub fn kind(&self) -> HandleType {
        self.kind
    }

    /// Digit string of the handle.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Numeric value of the handle, if it fits in a `u64`.
    pub fn number(&self) -> Option<u64> {
        self.id.parse().ok()
    }

    /// Digits without leading zeros; `"0"` for an all-zero id.
    fn canonical_id(&self) -> &str {
        match self.id.trim_start_matches('0') {
            "" => "0",
            digits => digits,
        }
    }

    pub fn is_collection(&self) -> bool {
        self.kind == HandleType::Collection
    }

    pub fn is_document(&self) -> bool {
        self.kind == HandleType::Document
    }

    pub fn is_version(&self) -> bool {
        self.kind == HandleType::Version
    }

    /// Whether the handle names something with downloadable content.
    pub fn is_downloadable(&self) -> bool {
        matches!(self.kind, HandleType::Document | HandleType::Version)
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.canonical_id() == other.canonical_id()
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.canonical_id().hash(state);
    }
}

impl Ord for Handle {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.canonical_id(), other.canonical_id());
        self.kind
            .cmp(&other.kind)
            .then_with(|| a.len().cmp(&b.len()))
            .then_with(|| a.cmp(b))
    }
}

impl PartialOrd for Handle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.id)
    }
}

impl FromStr for Handle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (prefix, digits) = s
            .split_once('-')
            .ok_or_else(|| Error::InvalidHandle(s.to_string()))?;

        let kind = HandleType::ALL
            .into_iter()
            .find(|kind| kind.identifier() == prefix)
            .ok_or_else(|| Error::InvalidHandle(s.to_string()))?;

        Handle::new(kind, digits).map_err(|_| Error::InvalidHandle(s.to_string()))
    }
}

impl TryFrom<&str> for Handle {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

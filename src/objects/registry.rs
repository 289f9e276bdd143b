//! Handle-keyed cache of resolved objects.
//!
//! Each handle maps to a `OnceCell` so concurrent resolves of one handle share
//! a single in-flight fetch. A failed fetch leaves the cell empty and the next
//! resolve tries again.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::sync::{Mutex, OnceCell, Semaphore};

use crate::api::{Page, Resource, SessionManager};
use crate::error::{Error, Result};
use crate::html::{parse_history_page, parse_listing_page, parse_property_page, PropertyPage};
use crate::model::{
    CollectionObject, DocuShareObject, DocumentObject, Handle, HandleType, ObjectInfo,
    VersionObject,
};

/// Default bound on concurrent page fetches.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

type Slot<T> = Arc<OnceCell<Arc<T>>>;

/// Single-flight object cache for one site.
pub struct ObjectRegistry {
    session: Arc<SessionManager>,
    objects: Mutex<HashMap<Handle, Slot<DocuShareObject>>>,
    listings: Mutex<HashMap<Handle, Slot<Vec<Handle>>>>,
    fetch_limit: Semaphore,
    max_concurrent_fetches: usize,
}

impl ObjectRegistry {
    pub fn new(session: Arc<SessionManager>, max_concurrent_fetches: usize) -> Self {
        let max_concurrent_fetches = max_concurrent_fetches.max(1);
        Self {
            session,
            objects: Mutex::new(HashMap::new()),
            listings: Mutex::new(HashMap::new()),
            fetch_limit: Semaphore::new(max_concurrent_fetches),
            max_concurrent_fetches,
        }
    }

    /// Return the object for `handle`, fetching it on first use.
    pub async fn resolve(&self, handle: &Handle) -> Result<Arc<DocuShareObject>> {
        let slot = slot(&self.objects, handle).await;
        let object = slot.get_or_try_init(|| self.fetch_object(handle)).await?;
        Ok(object.clone())
    }

    /// Resolve several handles concurrently, keeping their order.
    ///
    /// Fails with the first error encountered.
    pub async fn resolve_many(&self, handles: &[Handle]) -> Result<Vec<Arc<DocuShareObject>>> {
        stream::iter(handles.iter().map(|handle| self.resolve(handle)))
            .buffered(self.max_concurrent_fetches)
            .try_collect()
            .await
    }

    /// Immediate children of a collection in listing order.
    pub async fn list_children(&self, collection: &Handle) -> Result<Arc<Vec<Handle>>> {
        if !collection.is_collection() {
            return Err(Error::InvalidHandle(format!(
                "{} (expected a Collection)",
                collection
            )));
        }
        let slot = slot(&self.listings, collection).await;
        let children = slot
            .get_or_try_init(|| self.fetch_listing(collection))
            .await?;
        Ok(children.clone())
    }

    /// Whether `handle` is currently cached.
    pub async fn contains(&self, handle: &Handle) -> bool {
        self.objects
            .lock()
            .await
            .get(handle)
            .is_some_and(|slot| slot.initialized())
    }

    /// Drop the cached object and listing of `handle`.
    pub async fn invalidate(&self, handle: &Handle) {
        self.objects.lock().await.remove(handle);
        self.listings.lock().await.remove(handle);
        tracing::debug!("Invalidated {}", handle);
    }

    /// Drop every cached object and listing.
    pub async fn clear(&self) {
        self.objects.lock().await.clear();
        self.listings.lock().await.clear();
    }

    /// Check that a Version and its Document reference each other.
    ///
    /// Returns `Ok(false)` when the version page does not name its document
    /// or the document's history does not list the version.
    pub async fn verify_version_link(&self, version: &Handle) -> Result<bool> {
        let object = self.resolve(version).await?;
        let Some(version_object) = object.as_version() else {
            return Err(Error::InvalidHandle(format!("{} (expected a Version)", version)));
        };
        let Some(document) = &version_object.document_handle else {
            return Ok(false);
        };

        let document = self.resolve(document).await?;
        let linked = document
            .as_document()
            .is_some_and(|doc| doc.version_handles.contains(version));
        if !linked {
            tracing::warn!(
                "{} is not listed in the history of {}",
                version,
                document.handle()
            );
        }
        Ok(linked)
    }

    /// GET a page under the fetch limit.
    async fn fetch(&self, resource: Resource<'_>) -> Result<Page> {
        let url = self.session.transport().url(resource)?;
        // The semaphore is never closed.
        let _permit = self.fetch_limit.acquire().await.ok();
        self.session.fetch_page(&url).await
    }

    async fn fetch_object(&self, handle: &Handle) -> Result<Arc<DocuShareObject>> {
        tracing::debug!("Fetching properties of {}", handle);
        let page = self.fetch(Resource::Properties(handle)).await?;
        let properties = parse_property_page(&page.body, handle)?;

        let related = match handle.kind() {
            HandleType::Document => {
                let history = self.fetch(Resource::History(handle)).await?;
                parse_history_page(&history.body, handle)?
            }
            HandleType::Collection => self.list_children(handle).await?.as_ref().clone(),
            HandleType::Version => Vec::new(),
        };

        Ok(Arc::new(build_object(handle, properties, related)?))
    }

    async fn fetch_listing(&self, collection: &Handle) -> Result<Arc<Vec<Handle>>> {
        tracing::debug!("Fetching listing of {}", collection);
        let page = self.fetch(Resource::Listing(collection)).await?;
        Ok(Arc::new(parse_listing_page(&page.body, collection)?))
    }
}

async fn slot<T>(map: &Mutex<HashMap<Handle, Slot<T>>>, handle: &Handle) -> Slot<T> {
    map.lock()
        .await
        .entry(handle.clone())
        .or_insert_with(|| Arc::new(OnceCell::new()))
        .clone()
}

/// Assemble a typed object.
///
/// `related` holds version handles for Documents and child handles for
/// Collections.
fn build_object(
    handle: &Handle,
    page: PropertyPage,
    related: Vec<Handle>,
) -> Result<DocuShareObject> {
    let missing = |what: &str| Error::Parse {
        context: format!("properties page of {}", handle),
        snippet: format!("no {} found", what),
    };

    let info = ObjectInfo {
        handle: handle.clone(),
        title: page.title,
        properties: page.properties,
        fetched_at: Utc::now(),
    };

    let object = match handle.kind() {
        HandleType::Document => DocuShareObject::Document(DocumentObject {
            info,
            filename: page.filename.ok_or_else(|| missing("filename"))?,
            document_control_number: page.document_control_number,
            current_version_handle: related.first().cloned(),
            version_handles: related,
        }),
        HandleType::Version => DocuShareObject::Version(VersionObject {
            info,
            filename: page.filename.ok_or_else(|| missing("filename"))?,
            version_number: page
                .version_number
                .ok_or_else(|| missing("version number"))?,
            document_handle: page.document_handle,
        }),
        HandleType::Collection => DocuShareObject::Collection(CollectionObject {
            info,
            child_handles: related,
        }),
    };
    Ok(object)
}

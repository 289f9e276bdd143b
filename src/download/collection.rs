//! Downloading the documents of a collection.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::DownloadLayout;
use crate::download::engine::{
    DownloadEngine, DownloadOptions, DownloadOutcome, DownloadRequest, ProgressFactory,
};
use crate::error::{Error, Result};
use crate::fs::{collection_directory_name, nested_directory};
use crate::model::Handle;
use crate::objects::build_tree;

/// Settings for a collection download.
#[derive(Debug, Clone)]
pub struct CollectionDownloadOptions {
    pub layout: DownloadLayout,
    /// Name tree directories after collection titles instead of handles.
    pub title_as_directory_name: bool,
    pub overwrite: bool,
    /// Simultaneous transfers.
    pub concurrency: usize,
}

impl Default for CollectionDownloadOptions {
    fn default() -> Self {
        Self {
            layout: DownloadLayout::default(),
            title_as_directory_name: true,
            overwrite: false,
            concurrency: 4,
        }
    }
}

impl DownloadEngine {
    /// Work out which documents go where, without downloading anything.
    pub async fn plan_collection(
        &self,
        collection: &Handle,
        directory: &Path,
        options: &CollectionDownloadOptions,
    ) -> Result<Vec<DownloadRequest>> {
        if !collection.is_collection() {
            return Err(Error::InvalidHandle(format!(
                "{} (expected a Collection)",
                collection
            )));
        }

        let request = |handle: &Handle, directory: PathBuf| DownloadRequest {
            handle: handle.clone(),
            directory,
            options: DownloadOptions {
                filename: None,
                overwrite: options.overwrite,
            },
        };

        let requests = match options.layout {
            DownloadLayout::Children => {
                let children = self.registry().list_children(collection).await?;
                children
                    .iter()
                    .filter(|h| h.is_document())
                    .map(|h| request(h, directory.to_path_buf()))
                    .collect()
            }
            DownloadLayout::Flatten => {
                let tree = build_tree(self.registry(), collection).await?;
                let mut seen = HashSet::new();
                tree.documents()
                    .into_iter()
                    .filter(|h| seen.insert(*h))
                    .map(|h| request(h, directory.to_path_buf()))
                    .collect()
            }
            DownloadLayout::Tree => {
                let tree = build_tree(self.registry(), collection).await?;
                let mut requests = Vec::new();
                for (path, document) in tree.document_paths() {
                    let mut names = Vec::with_capacity(path.len());
                    for handle in path {
                        names.push(self.directory_name(handle, options).await?);
                    }
                    requests.push(request(document, nested_directory(directory, &names)));
                }
                requests
            }
        };

        tracing::debug!(
            "{} documents to download from {} ({} layout)",
            requests.len(),
            collection,
            options.layout
        );
        Ok(requests)
    }

    async fn directory_name(
        &self,
        collection: &Handle,
        options: &CollectionDownloadOptions,
    ) -> Result<String> {
        if !options.title_as_directory_name {
            return Ok(collection.to_string());
        }
        let object = self.registry().resolve(collection).await?;
        Ok(collection_directory_name(collection, Some(object.title()), true))
    }

    /// Download the documents of `collection` below `directory`.
    ///
    /// Every planned download is attempted. Returns the written paths, or the
    /// first failure if any download failed.
    pub async fn download_collection(
        &self,
        collection: &Handle,
        directory: &Path,
        options: &CollectionDownloadOptions,
        progress: Option<&dyn ProgressFactory>,
    ) -> Result<Vec<PathBuf>> {
        let requests = self.plan_collection(collection, directory, options).await?;
        let outcomes = self
            .download_many(requests, options.concurrency, progress)
            .await;
        collect_paths(outcomes)
    }
}

fn collect_paths(outcomes: Vec<DownloadOutcome>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(outcomes.len());
    let mut first_error = None;
    for outcome in outcomes {
        match outcome.result {
            Ok(path) => paths.push(path),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(paths),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_paths_reports_failure() {
        let ok = DownloadOutcome {
            handle: "Document-1".parse().unwrap(),
            result: Ok(PathBuf::from("/out/a.pdf")),
        };
        let failed = DownloadOutcome {
            handle: "Document-2".parse().unwrap(),
            result: Err(Error::NotFound {
                url: "u".into(),
            }),
        };
        assert_eq!(collect_paths(vec![ok]).unwrap(), vec![PathBuf::from("/out/a.pdf")]);

        let ok = DownloadOutcome {
            handle: "Document-1".parse().unwrap(),
            result: Ok(PathBuf::from("/out/a.pdf")),
        };
        assert!(matches!(
            collect_paths(vec![ok, failed]),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_default_options() {
        let options = CollectionDownloadOptions::default();
        assert_eq!(options.layout, DownloadLayout::Children);
        assert!(options.title_as_directory_name);
        assert!(!options.overwrite);
    }
}

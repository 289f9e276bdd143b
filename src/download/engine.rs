//! Streaming downloads of Documents and Versions.
//!
//! Content is streamed into a temporary file created in the destination
//! directory and renamed to its final name only after the byte count matched
//! the declared `Content-Length`. Dropping the temporary path on any error or
//! cancellation removes the partial file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::api::{ContentBody, Resource, RetryPolicy, SessionManager};
use crate::error::{Error, Result};
use crate::fs::{collision_candidates, ensure_dir, sanitize_filename};
use crate::model::Handle;
use crate::objects::ObjectRegistry;
use crate::output::progress::ProgressSink;

/// Prefix of in-flight temporary files.
const TEMP_PREFIX: &str = ".docushare-";
const TEMP_SUFFIX: &str = ".part";

/// Per-download settings.
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// File name to use instead of the one the site suggests.
    pub filename: Option<String>,
    /// Replace an existing file instead of picking a numbered name.
    pub overwrite: bool,
}

/// One entry of a batch download.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub handle: Handle,
    pub directory: PathBuf,
    pub options: DownloadOptions,
}

/// Result of one entry of a batch download.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub handle: Handle,
    pub result: Result<PathBuf>,
}

/// Creates a progress sink per download of a batch.
pub trait ProgressFactory: Send + Sync {
    fn create(&self, label: &str) -> Box<dyn ProgressSink>;
}

impl ProgressFactory for crate::output::progress::DownloadBars {
    fn create(&self, label: &str) -> Box<dyn ProgressSink> {
        Box::new(self.add(label))
    }
}

/// Downloads content using the shared session and registry.
pub struct DownloadEngine {
    session: Arc<SessionManager>,
    registry: Arc<ObjectRegistry>,
    retry: RetryPolicy,
}

impl DownloadEngine {
    pub fn new(
        session: Arc<SessionManager>,
        registry: Arc<ObjectRegistry>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            session,
            registry,
            retry,
        }
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Download a Document (its current content) or a Version into
    /// `directory` and return the written path.
    pub async fn download(
        &self,
        handle: &Handle,
        directory: &Path,
        options: &DownloadOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<PathBuf> {
        let result = self.download_inner(handle, directory, options, progress).await;
        if let Some(progress) = progress {
            progress.finish();
        }
        result
    }

    async fn download_inner(
        &self,
        handle: &Handle,
        directory: &Path,
        options: &DownloadOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<PathBuf> {
        if !handle.is_downloadable() {
            return Err(Error::InvalidHandle(format!(
                "{} (only Documents and Versions can be downloaded)",
                handle
            )));
        }

        let filename = match &options.filename {
            Some(name) => name.clone(),
            None => {
                let object = self.registry.resolve(handle).await?;
                object
                    .filename()
                    .ok_or_else(|| Error::InvalidHandle(handle.to_string()))?
                    .to_string()
            }
        };
        let filename = sanitize_filename(&filename)?;
        ensure_dir(directory).await?;

        let url = self.session.transport().url(Resource::Content(handle))?;
        let temp = self.fetch_to_temp(&url, directory, progress).await?;
        let path = persist(temp, directory, &filename, options.overwrite)?;

        tracing::info!("Downloaded {} to {}", handle, path.display());
        Ok(path)
    }

    /// Stream the content into a temporary file, with network retries and
    /// one full restart after a re-login.
    async fn fetch_to_temp(
        &self,
        url: &Url,
        directory: &Path,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<TempPath> {
        let epoch = self.session.ensure_session().await?;
        match self.fetch_with_retry(url, directory, progress).await {
            Err(Error::SessionExpired) => {
                tracing::info!("Session lost while downloading {}, restarting", url);
                self.session.recover(epoch).await?;
                match self.fetch_with_retry(url, directory, progress).await {
                    Err(Error::SessionExpired) => Err(Error::Authentication(format!(
                        "Session lost again right after re-login while downloading {}",
                        url
                    ))),
                    result => result,
                }
            }
            result => result,
        }
    }

    async fn fetch_with_retry(
        &self,
        url: &Url,
        directory: &Path,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<TempPath> {
        let username = self.session.username().await.unwrap_or_default();
        let username = username.as_str();
        self.retry
            .run_if(url.as_str(), Error::is_retryable_transfer, || async move {
                self.fetch_once(url, username, directory, progress).await
            })
            .await
    }

    async fn fetch_once(
        &self,
        url: &Url,
        username: &str,
        directory: &Path,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<TempPath> {
        let response = self.session.transport().get_content(url, username).await?;
        let expected = response.content_length;

        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(directory)?;
        let (file, temp_path) = temp.into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let report = |received: u64| {
            if let Some(progress) = progress {
                progress.update(received, expected);
            }
        };

        let mut received: u64 = 0;
        report(received);
        match response.body {
            ContentBody::Buffered(bytes) => {
                file.write_all(&bytes).await?;
                received = bytes.len() as u64;
                report(received);
            }
            ContentBody::Stream(response) => {
                let mut stream = response.bytes_stream();
                while let Some(chunk) = stream.next().await {
                    let chunk = match chunk {
                        Ok(chunk) => chunk,
                        // A body cut short of its declared length.
                        Err(e) => {
                            tracing::debug!("Stream of {} failed after {} bytes: {}", url, received, e);
                            return Err(match expected {
                                Some(expected) => Error::DownloadIntegrity { expected, received },
                                None => e.into(),
                            });
                        }
                    };
                    file.write_all(&chunk).await?;
                    received += chunk.len() as u64;
                    report(received);
                }
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if let Some(expected) = expected {
            if received != expected {
                return Err(Error::DownloadIntegrity { expected, received });
            }
        }

        Ok(temp_path)
    }

    /// Download several handles with at most `concurrency` transfers at once.
    ///
    /// Outcomes are reported in completion order.
    pub async fn download_many(
        &self,
        requests: Vec<DownloadRequest>,
        concurrency: usize,
        progress: Option<&dyn ProgressFactory>,
    ) -> Vec<DownloadOutcome> {
        stream::iter(requests)
            .map(|request| async move {
                let sink = progress.map(|factory| factory.create(&request.handle.to_string()));
                let result = self
                    .download(
                        &request.handle,
                        &request.directory,
                        &request.options,
                        sink.as_deref(),
                    )
                    .await;
                if let Err(e) = &result {
                    tracing::warn!("Download of {} failed: {}", request.handle, e);
                }
                DownloadOutcome {
                    handle: request.handle,
                    result,
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await
    }
}

/// Move a completed temporary file to its final name.
///
/// Without `overwrite`, an existing `name.ext` leads to `name (1).ext`,
/// `name (2).ext` and so on. The rename never replaces a file another writer
/// created in the meantime.
fn persist(temp: TempPath, directory: &Path, filename: &str, overwrite: bool) -> Result<PathBuf> {
    if overwrite {
        let target = directory.join(filename);
        temp.persist(&target).map_err(|e| Error::Io(e.error))?;
        return Ok(target);
    }

    let mut temp = temp;
    for candidate in collision_candidates(directory, filename) {
        match temp.persist_noclobber(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!("{} exists, trying next name", candidate.display());
                temp = e.path;
            }
            Err(e) => return Err(Error::Io(e.error)),
        }
    }

    Err(Error::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free file name for {} in {}", filename, directory.display()),
    )))
}

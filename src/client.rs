//! The public entry point: one [`DocuShare`] per site.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::api::{
    HttpSettings, Page, RetryPolicy, SessionManager, SessionSettings, Transport,
};
use crate::auth::{
    CredentialSource, EnvCredentials, KeyringCredentials, NodeEvaluator, PromptCredentials,
    ScriptEvaluator, StaticCredentials,
};
use crate::config::{Config, PasswordSource};
use crate::download::{
    CollectionDownloadOptions, DownloadEngine, DownloadOptions, DownloadOutcome, DownloadRequest,
    ProgressFactory,
};
use crate::error::Result;
use crate::html::{DefaultClassifier, PageClassifier};
use crate::model::{DocuShareObject, Handle};
use crate::objects::{build_tree, CollectionTreeNode, ObjectRegistry, DEFAULT_MAX_CONCURRENT_FETCHES};
use crate::output::progress::ProgressSink;

/// Configures a [`DocuShare`] client.
pub struct DocuShareBuilder {
    base_url: String,
    http: HttpSettings,
    session: SessionSettings,
    retry: RetryPolicy,
    max_concurrent_fetches: usize,
    classifier: Arc<dyn PageClassifier>,
    evaluator: Arc<dyn ScriptEvaluator>,
}

impl DocuShareBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: HttpSettings::default(),
            session: SessionSettings::default(),
            retry: RetryPolicy::default(),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            classifier: Arc::new(DefaultClassifier),
            evaluator: Arc::new(NodeEvaluator::default()),
        }
    }

    pub fn http_settings(mut self, http: HttpSettings) -> Self {
        self.http = http;
        self
    }

    pub fn session_settings(mut self, session: SessionSettings) -> Self {
        self.session = session;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit;
        self
    }

    /// Replace the policy that recognizes error and login pages.
    pub fn classifier(mut self, classifier: Arc<dyn PageClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replace the evaluator of the login challenge script.
    pub fn evaluator(mut self, evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn build(self) -> Result<DocuShare> {
        let transport = Arc::new(Transport::new(&self.base_url, self.http, self.classifier)?);
        let session = Arc::new(SessionManager::new(
            transport,
            self.evaluator,
            self.session,
            self.retry,
        ));
        let registry = Arc::new(ObjectRegistry::new(
            session.clone(),
            self.max_concurrent_fetches,
        ));
        let engine = DownloadEngine::new(session.clone(), registry.clone(), self.retry);

        Ok(DocuShare {
            session,
            registry,
            engine,
        })
    }
}

/// Client for one DocuShare site.
///
/// Owns the session, the object cache and the download engine. Cloning is not
/// supported; share it behind an `Arc`.
pub struct DocuShare {
    session: Arc<SessionManager>,
    registry: Arc<ObjectRegistry>,
    engine: DownloadEngine,
}

impl DocuShare {
    /// Start configuring a client for the site rooted at `base_url`.
    pub fn builder(base_url: impl Into<String>) -> DocuShareBuilder {
        DocuShareBuilder::new(base_url)
    }

    /// Client with default settings.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder(base_url).build()
    }

    /// Client configured from a loaded configuration file.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::builder(config.site.base_url.clone())
            .http_settings(config.http_settings())
            .session_settings(config.session_settings())
            .retry_policy(config.retry_policy())
            .max_concurrent_fetches(config.network.max_concurrent_fetches)
            .evaluator(Arc::new(NodeEvaluator::new(config.auth.js_interpreter.clone())))
            .build()
    }

    pub fn base_url(&self) -> &Url {
        self.session.transport().base_url()
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &DownloadEngine {
        &self.engine
    }

    /// Log in; the source is reused for transparent re-login.
    pub async fn login(&self, source: Arc<dyn CredentialSource>) -> Result<()> {
        self.session.login(source).await
    }

    /// Log in with a fixed username and password.
    pub async fn login_with_password(&self, username: &str, password: &str) -> Result<()> {
        self.login(Arc::new(StaticCredentials::new(username, password)))
            .await
    }

    /// End the session and drop all cached objects.
    pub async fn logout(&self) -> Result<()> {
        self.registry.clear().await;
        self.session.logout().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.is_authenticated().await
    }

    pub async fn username(&self) -> Option<String> {
        self.session.username().await
    }

    /// The object named by `handle`, fetched on first use.
    pub async fn object(&self, handle: &Handle) -> Result<Arc<DocuShareObject>> {
        self.registry.resolve(handle).await
    }

    /// Several objects, fetched concurrently, in input order.
    pub async fn objects(&self, handles: &[Handle]) -> Result<Vec<Arc<DocuShareObject>>> {
        self.registry.resolve_many(handles).await
    }

    pub async fn list_children(&self, collection: &Handle) -> Result<Arc<Vec<Handle>>> {
        self.registry.list_children(collection).await
    }

    /// Expanded hierarchy below `collection`.
    pub async fn tree(&self, collection: &Handle) -> Result<CollectionTreeNode> {
        build_tree(&self.registry, collection).await
    }

    /// Forget the cached state of `handle` so the next access re-fetches it.
    pub async fn invalidate(&self, handle: &Handle) {
        self.registry.invalidate(handle).await
    }

    pub async fn clear_cache(&self) {
        self.registry.clear().await
    }

    pub async fn verify_version_link(&self, version: &Handle) -> Result<bool> {
        self.registry.verify_version_link(version).await
    }

    /// Download a Document or Version into `directory`.
    pub async fn download(
        &self,
        handle: &Handle,
        directory: &Path,
        options: &DownloadOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<PathBuf> {
        self.engine
            .download(handle, directory, options, progress)
            .await
    }

    pub async fn download_many(
        &self,
        requests: Vec<DownloadRequest>,
        concurrency: usize,
        progress: Option<&dyn ProgressFactory>,
    ) -> Vec<DownloadOutcome> {
        self.engine
            .download_many(requests, concurrency, progress)
            .await
    }

    pub async fn download_collection(
        &self,
        collection: &Handle,
        directory: &Path,
        options: &CollectionDownloadOptions,
        progress: Option<&dyn ProgressFactory>,
    ) -> Result<Vec<PathBuf>> {
        self.engine
            .download_collection(collection, directory, options, progress)
            .await
    }

    /// Authenticated GET of any page of the site.
    ///
    /// `reference` is resolved against the site root. Error and login pages
    /// are classified like any other request.
    pub async fn http_get(&self, reference: &str) -> Result<Page> {
        let url = self.session.transport().join(reference)?;
        self.session.fetch_page(&url).await
    }
}

/// Credential source described by `config`.
pub fn credential_source(config: &Config) -> Arc<dyn CredentialSource> {
    let site = config.site.base_url.clone();
    let username = Some(config.site.username.clone()).filter(|u| !u.trim().is_empty());
    match config.auth.password_source {
        PasswordSource::Prompt => Arc::new(PromptCredentials::new(site, username)),
        PasswordSource::Keyring => Arc::new(KeyringCredentials::new(
            site,
            username.unwrap_or_default(),
        )),
        PasswordSource::Env => Arc::new(EnvCredentials::new(
            username.unwrap_or_default(),
            config.auth.password_env.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.site.base_url = "https://ds.example.com/docushare".into();
        let client = DocuShare::from_config(&config).unwrap();
        assert_eq!(client.base_url().as_str(), "https://ds.example.com/docushare/");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(DocuShare::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_new_client_is_logged_out() {
        let client = DocuShare::new("https://ds.example.com/").unwrap();
        assert!(!client.is_authenticated().await);
        assert_eq!(client.username().await, None);
    }
}

//! HTTP transport for a DocuShare site.
//!
//! Owns the cookie-carrying HTTP client, builds resource URLs relative to the
//! site root and turns responses into either content or a typed error via the
//! configured [`PageClassifier`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::{header, Client, Response};
use tokio::sync::RwLock;
use url::Url;

use crate::error::{Error, Result};
use crate::html::{PageClassifier, PageKind, PageView};
use crate::model::Handle;

/// Path of the web UI below the site root.
const DSWEB: &str = "dsweb/";

/// Addressable server resources.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// Login form with the challenge nonce.
    Login,
    /// Login form submission.
    ApplyLogin,
    /// Property page of any object.
    Properties(&'a Handle),
    /// Version history of a document.
    History(&'a Handle),
    /// Child listing of a collection.
    Listing(&'a Handle),
    /// Binary content of a document or version.
    Content(&'a Handle),
}

impl Resource<'_> {
    fn path(&self) -> String {
        match self {
            Resource::Login => "Login".to_string(),
            Resource::ApplyLogin => "ApplyLogin".to_string(),
            Resource::Properties(h) => format!("Services/{}", h),
            Resource::History(h) => format!("ServicesLib/{}/History", h),
            Resource::Listing(h) => format!("View/{}", h),
            Resource::Content(h) => format!("Get/{}", h),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    /// Whole-request timeout for pages.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Idle timeout between body chunks, used for downloads.
    pub read_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("docushare-dl/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
        }
    }
}

/// A fully read text response.
#[derive(Debug, Clone)]
pub struct Page {
    /// URL the request was sent to.
    pub url: Url,
    /// URL after redirects.
    pub final_url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl Page {
    pub fn view(&self) -> PageView<'_> {
        PageView {
            requested: &self.url,
            final_url: &self.final_url,
            status: self.status,
            content_type: self.content_type.as_deref(),
            body: Some(&self.body),
        }
    }
}

/// Body of a content response.
pub enum ContentBody {
    /// Not yet read.
    Stream(Response),
    /// Already read while checking an HTML response for error pages.
    Buffered(Vec<u8>),
}

/// A content response that passed classification.
pub struct ContentResponse {
    pub final_url: Url,
    /// Declared `Content-Length`, if any.
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub body: ContentBody,
}

struct HttpState {
    client: Client,
    jar: Arc<Jar>,
}

/// Cookie-aware HTTP access to one DocuShare site.
pub struct Transport {
    base_url: Url,
    dsweb: Url,
    settings: HttpSettings,
    classifier: Arc<dyn PageClassifier>,
    state: RwLock<HttpState>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url.as_str())
            .field("classifier", &self.classifier)
            .finish()
    }
}

impl Transport {
    /// Create a transport for the site rooted at `base_url`.
    ///
    /// A missing trailing slash is added so relative resources resolve
    /// below the root.
    pub fn new(
        base_url: &str,
        settings: HttpSettings,
        classifier: Arc<dyn PageClassifier>,
    ) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let dsweb = base_url.join(DSWEB)?;
        let state = Self::build_state(&settings)?;

        Ok(Self {
            base_url,
            dsweb,
            settings,
            classifier,
            state: RwLock::new(state),
        })
    }

    fn build_state(settings: &HttpSettings) -> Result<HttpState> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .user_agent(&settings.user_agent)
            .cookie_provider(jar.clone())
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(HttpState { client, jar })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of a server resource.
    pub fn url(&self, resource: Resource<'_>) -> Result<Url> {
        Ok(self.dsweb.join(&resource.path())?)
    }

    /// Resolve a URL relative to the site root.
    pub fn join(&self, reference: &str) -> Result<Url> {
        Ok(self.base_url.join(reference)?)
    }

    /// Drop all cookies by starting over with a fresh client.
    pub async fn reset_cookies(&self) -> Result<()> {
        let fresh = Self::build_state(&self.settings)?;
        *self.state.write().await = fresh;
        Ok(())
    }

    /// Whether the jar holds a cookie named `name` for the site.
    pub async fn has_cookie(&self, name: &str) -> bool {
        let state = self.state.read().await;
        let Some(header) = state.jar.cookies(&self.base_url) else {
            return false;
        };
        let Ok(cookies) = header.to_str() else {
            return false;
        };
        cookies
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(key, _)| key == name)
    }

    async fn client(&self) -> Client {
        self.state.read().await.client.clone()
    }

    /// GET a text page without interpreting it.
    pub async fn get_page(&self, url: &Url) -> Result<Page> {
        tracing::debug!("GET {}", url);
        let response = self
            .client()
            .await
            .get(url.clone())
            .timeout(self.settings.timeout)
            .send()
            .await?;
        read_page(url, response).await
    }

    /// POST an url-encoded form and read the answer as text.
    pub async fn post_form(&self, url: &Url, form: &[(&str, &str)]) -> Result<Page> {
        tracing::debug!("POST {}", url);
        let response = self
            .client()
            .await
            .post(url.clone())
            .timeout(self.settings.timeout)
            .form(form)
            .send()
            .await?;
        read_page(url, response).await
    }

    /// Map a page to `Ok` if it is the requested content.
    pub fn check(&self, page: &Page, username: &str) -> Result<()> {
        let kind = self.classifier.classify(&page.view());
        outcome(kind, &page.url, username)
    }

    /// GET binary content.
    ///
    /// Non-HTML bodies are left unread. HTML bodies are read and checked for
    /// error and login pages first.
    pub async fn get_content(&self, url: &Url, username: &str) -> Result<ContentResponse> {
        tracing::debug!("GET {}", url);
        let response = self.client().await.get(url.clone()).send().await?;

        let final_url = response.url().clone();
        let status = response.status().as_u16();
        let content_length = response.content_length();
        let content_type = header_string(&response, header::CONTENT_TYPE);

        let headers_only = PageView {
            requested: url,
            final_url: &final_url,
            status,
            content_type: content_type.as_deref(),
            body: None,
        };

        if !headers_only.is_html() {
            outcome(self.classifier.classify(&headers_only), url, username)?;
            return Ok(ContentResponse {
                final_url,
                content_length,
                content_type,
                body: ContentBody::Stream(response),
            });
        }

        let bytes = response.bytes().await?.to_vec();
        let text = String::from_utf8_lossy(&bytes);
        let view = PageView {
            body: Some(text.as_ref()),
            ..headers_only
        };
        outcome(self.classifier.classify(&view), url, username)?;

        Ok(ContentResponse {
            final_url,
            content_length,
            content_type,
            body: ContentBody::Buffered(bytes),
        })
    }
}

fn normalize_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url.trim())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::ConfigValidation {
            field: "base_url".to_string(),
            message: format!("'{}' is not an http(s) URL", base_url),
        });
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn header_string(response: &Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn read_page(url: &Url, response: Response) -> Result<Page> {
    let final_url = response.url().clone();
    let status = response.status().as_u16();
    let content_type = header_string(&response, header::CONTENT_TYPE);
    tracing::debug!("Response status: {} ({})", status, final_url);
    let body = response.text().await?;
    Ok(Page {
        url: url.clone(),
        final_url,
        status,
        content_type,
        body,
    })
}

/// Translate a classification into the error taxonomy.
fn outcome(kind: PageKind, url: &Url, username: &str) -> Result<()> {
    match kind {
        PageKind::Content => Ok(()),
        PageKind::LoginRequired => Err(Error::SessionExpired),
        PageKind::NotFound => Err(Error::NotFound {
            url: url.to_string(),
        }),
        PageKind::NotAuthorized => Err(Error::PermissionDenied {
            username: username.to_string(),
            url: url.to_string(),
        }),
        PageKind::SystemError { code, message } => Err(Error::SystemError {
            code,
            message,
            url: url.to_string(),
        }),
        PageKind::HttpStatus(status) if status >= 500 || status == 408 || status == 429 => Err(
            Error::Network(format!("HTTP {} from {}", status, url)),
        ),
        PageKind::HttpStatus(status) => Err(Error::HttpStatus {
            status,
            url: url.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::DefaultClassifier;

    fn transport(base: &str) -> Transport {
        Transport::new(base, HttpSettings::default(), Arc::new(DefaultClassifier)).unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let t = transport("https://ds.example.com/docushare");
        assert_eq!(t.base_url().as_str(), "https://ds.example.com/docushare/");
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let result = Transport::new(
            "ftp://ds.example.com/",
            HttpSettings::default(),
            Arc::new(DefaultClassifier),
        );
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_resource_urls() {
        let t = transport("https://ds.example.com/docushare/");
        let doc: Handle = "Document-0042".parse().unwrap();
        let col: Handle = "Collection-7".parse().unwrap();

        assert_eq!(
            t.url(Resource::Login).unwrap().as_str(),
            "https://ds.example.com/docushare/dsweb/Login"
        );
        assert_eq!(
            t.url(Resource::Properties(&doc)).unwrap().as_str(),
            "https://ds.example.com/docushare/dsweb/Services/Document-0042"
        );
        assert_eq!(
            t.url(Resource::History(&doc)).unwrap().as_str(),
            "https://ds.example.com/docushare/dsweb/ServicesLib/Document-0042/History"
        );
        assert_eq!(
            t.url(Resource::Listing(&col)).unwrap().as_str(),
            "https://ds.example.com/docushare/dsweb/View/Collection-7"
        );
        assert_eq!(
            t.url(Resource::Content(&doc)).unwrap().as_str(),
            "https://ds.example.com/docushare/dsweb/Get/Document-0042"
        );
    }

    #[test]
    fn test_outcome_mapping() {
        let url = Url::parse("https://ds.example.com/dsweb/Services/Document-1").unwrap();
        assert!(outcome(PageKind::Content, &url, "u").is_ok());
        assert!(matches!(
            outcome(PageKind::LoginRequired, &url, "u"),
            Err(Error::SessionExpired)
        ));
        assert!(matches!(
            outcome(PageKind::NotAuthorized, &url, "alice"),
            Err(Error::PermissionDenied { username, .. }) if username == "alice"
        ));
        assert!(matches!(
            outcome(PageKind::HttpStatus(503), &url, "u"),
            Err(Error::Network(_))
        ));
        assert!(matches!(
            outcome(PageKind::HttpStatus(400), &url, "u"),
            Err(Error::HttpStatus { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn test_fresh_jar_has_no_cookies() {
        let t = transport("https://ds.example.com/");
        assert!(!t.has_cookie("AmberUser").await);
        t.reset_cookies().await.unwrap();
        assert!(!t.has_cookie("AmberUser").await);
    }
}

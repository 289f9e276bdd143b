//! Classification of DocuShare responses.
//!
//! The service reports missing objects, missing permissions, system errors
//! and lost sessions through ordinary HTML pages, often with a success status.
//! All content sniffing for those cases lives behind [`PageClassifier`] so a
//! site with different markup only needs another implementation.

use std::fmt;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use crate::html::{element_text, selector};

static H1: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static H2: LazyLock<Selector> = LazyLock::new(|| selector("h2"));
static ERROR_CODE: LazyLock<Selector> = LazyLock::new(|| selector("input[name=\"dserrorcode\"]"));
static ERROR_MESSAGE: LazyLock<Selector> =
    LazyLock::new(|| selector("input[name=\"detail_message\"]"));
static LOGIN_TOKEN: LazyLock<Selector> = LazyLock::new(|| selector("input[name=\"login_token\"]"));

/// What a response turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    /// The requested content.
    Content,
    /// The session is gone; the server answered with its login page.
    LoginRequired,
    NotFound,
    NotAuthorized,
    SystemError { code: String, message: String },
    /// An HTTP failure status the page content did not explain.
    HttpStatus(u16),
}

/// A response as seen by a classifier.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    /// URL the request was sent to.
    pub requested: &'a Url,
    /// URL after redirects.
    pub final_url: &'a Url,
    pub status: u16,
    pub content_type: Option<&'a str>,
    /// Body text, present only for HTML responses.
    pub body: Option<&'a str>,
}

impl PageView<'_> {
    pub fn is_html(&self) -> bool {
        self.content_type
            .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text/html"))
            .unwrap_or(false)
    }
}

/// Policy deciding what a response means.
pub trait PageClassifier: Send + Sync + fmt::Debug {
    fn classify(&self, page: &PageView<'_>) -> PageKind;
}

/// Classifier for the observed DocuShare rendering.
///
/// - redirect to `dsweb/Login` or an inline login form: session lost
/// - `dserrorcode` / `detail_message` inputs: system error
/// - `<h1>` containing "Not Authorized": permission error
/// - `<h2>` containing "Not Found": missing object
/// - otherwise 404 / 401 / 403 fall back to their HTTP meaning
#[derive(Debug, Clone, Default)]
pub struct DefaultClassifier;

impl DefaultClassifier {
    fn is_login_url(url: &Url) -> bool {
        url.path().trim_end_matches('/').ends_with("/Login")
    }
}

impl PageClassifier for DefaultClassifier {
    fn classify(&self, page: &PageView<'_>) -> PageKind {
        if Self::is_login_url(page.final_url) && !Self::is_login_url(page.requested) {
            return PageKind::LoginRequired;
        }

        if let Some(body) = page.body.filter(|_| page.is_html()) {
            let document = Html::parse_document(body);

            let code = document.select(&ERROR_CODE).next();
            let message = document.select(&ERROR_MESSAGE).next();
            if code.is_some() || message.is_some() {
                let value = |el: Option<scraper::ElementRef<'_>>| {
                    el.and_then(|e| e.value().attr("value"))
                        .unwrap_or_default()
                        .to_string()
                };
                return PageKind::SystemError {
                    code: value(code),
                    message: value(message),
                };
            }

            if document
                .select(&H1)
                .any(|h1| element_text(h1).contains("Not Authorized"))
            {
                return PageKind::NotAuthorized;
            }

            if document
                .select(&H2)
                .any(|h2| element_text(h2).contains("Not Found"))
            {
                return PageKind::NotFound;
            }

            if !Self::is_login_url(page.requested) && document.select(&LOGIN_TOKEN).next().is_some()
            {
                return PageKind::LoginRequired;
            }
        }

        match page.status {
            200..=399 => PageKind::Content,
            404 | 410 => PageKind::NotFound,
            401 | 403 => PageKind::NotAuthorized,
            status => PageKind::HttpStatus(status),
        }
    }
}

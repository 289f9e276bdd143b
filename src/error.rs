//! Error types for the docushare-dl library and CLI.

use thiserror::Error;

/// Maximum number of characters of a page kept in a parse error.
const SNIPPET_LEN: usize = 300;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // Session errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Raised by the transport when the server dropped the session.
    /// Recovered by the session manager, never surfaced after one re-login.
    #[error("Session expired")]
    SessionExpired,

    // DocuShare errors
    #[error("{url} does not exist")]
    NotFound { url: String },

    #[error("\"{username}\" is not authorized to access {url}")]
    PermissionDenied { username: String, url: String },

    #[error("DocuShare system error (code: {code}, message: {message}, url: {url})")]
    SystemError {
        code: String,
        message: String,
        url: String,
    },

    #[error("Failed to parse {context}: unexpected page content: {snippet}")]
    Parse { context: String, snippet: String },

    #[error("'{0}' is not a valid DocuShare handle")]
    InvalidHandle(String),

    // Transfer errors
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Download incomplete: expected {expected} bytes, received {received}")]
    DownloadIntegrity { expected: u64, received: u64 },

    // File system errors
    #[error("Invalid filename (path traversal attempt): {0}")]
    InvalidFilename(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl Error {
    /// Build a parse error keeping only the head of the offending page.
    pub fn parse(context: impl Into<String>, page: &str) -> Self {
        let collapsed = page.split_whitespace().collect::<Vec<_>>().join(" ");
        let snippet = match collapsed.char_indices().nth(SNIPPET_LEN) {
            Some((idx, _)) => format!("{}...", &collapsed[..idx]),
            None => collapsed,
        };
        Error::Parse {
            context: context.into(),
            snippet,
        }
    }

    /// Whether a bounded retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    /// Whether restarting a transfer may succeed.
    ///
    /// A body cut short of its declared length is worth another attempt too.
    pub fn is_retryable_transfer(&self) -> bool {
        self.is_transient() || matches!(self, Error::DownloadIntegrity { .. })
    }
}

/// Process exit codes used by the CLI.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const ABORT: i32 = 1;
    pub const AUTH_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const DOWNLOAD_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
    pub const SOME_DOWNLOADS_FAILED: i32 = 6;
    pub const NOT_FOUND: i32 = 7;
}

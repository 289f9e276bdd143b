//! Configuration structures and loading logic.

use crate::api::{HttpSettings, RetryPolicy, SessionSettings};
use crate::auth::DEFAULT_JS_INTERPRETER;
use crate::config::modes::{DownloadLayout, PasswordSource};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub download: DownloadConfig,
}

/// The DocuShare site and account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Root URL of the site, e.g. `https://docushare.example.com/docushare/`.
    #[serde(default)]
    pub base_url: String,

    /// Login name. Prompted for when empty and the password is prompted too.
    #[serde(default)]
    pub username: String,

    /// Authentication domain.
    #[serde(default = "default_domain")]
    pub domain: String,
}

/// Login settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Where the password comes from (prompt, keyring, env).
    #[serde(default)]
    pub password_source: PasswordSource,

    /// Environment variable holding the password for `password_source = "env"`.
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// JavaScript interpreter that evaluates the login challenge.
    #[serde(default = "default_js_interpreter")]
    pub js_interpreter: PathBuf,

    /// Password attempts per login.
    #[serde(default = "default_login_attempts")]
    pub login_attempts: u32,
}

/// HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for page requests and idle download streams.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Attempts per request for transient network failures, first included.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Concurrent property page fetches.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

/// Download options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Base directory for downloads. Defaults to the current directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Simultaneous downloads.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Replace existing files instead of numbering new ones.
    #[serde(default)]
    pub overwrite: bool,

    /// Layout for collection downloads.
    #[serde(default)]
    pub layout: DownloadLayout,

    /// Name tree directories after collection titles instead of handles.
    #[serde(default = "default_true")]
    pub collection_title_as_directory_name: bool,

    /// Whether to show download progress bars.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            domain: default_domain(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password_source: PasswordSource::default(),
            password_env: default_password_env(),
            js_interpreter: default_js_interpreter(),
            login_attempts: default_login_attempts(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: None,
            concurrency: default_concurrency(),
            overwrite: false,
            layout: DownloadLayout::default(),
            collection_title_as_directory_name: true,
            show_progress: true,
        }
    }
}

fn default_domain() -> String {
    "DocuShare".to_string()
}

fn default_password_env() -> String {
    "DOCUSHARE_PASSWORD".to_string()
}

fn default_js_interpreter() -> PathBuf {
    PathBuf::from(DEFAULT_JS_INTERPRETER)
}

fn default_login_attempts() -> u32 {
    3
}

fn default_user_agent() -> String {
    concat!("docushare-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_max_concurrent_fetches() -> usize {
    4
}

fn default_concurrency() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}. Create one from config.example.toml",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Platform default location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "docushare-dl").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Get the effective download directory.
    pub fn download_directory(&self) -> PathBuf {
        self.download
            .directory
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            user_agent: self.network.user_agent.clone(),
            timeout: Duration::from_secs(self.network.timeout_secs),
            connect_timeout: Duration::from_secs(self.network.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.network.timeout_secs),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            domain: self.site.domain.clone(),
            login_attempts: self.auth.login_attempts,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.network.max_retries,
            Duration::from_millis(self.network.retry_base_delay_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [site]
            base_url = "https://ds.example.com/docushare/"
            username = "alice"
            "#,
        )
        .unwrap();
        assert_eq!(config.site.domain, "DocuShare");
        assert_eq!(config.auth.password_source, PasswordSource::Prompt);
        assert_eq!(config.auth.login_attempts, 3);
        assert_eq!(config.network.max_concurrent_fetches, 4);
        assert_eq!(config.download.layout, DownloadLayout::Children);
        assert!(config.download.collection_title_as_directory_name);
    }

    #[test]
    fn test_full_config() {
        let config: Config = toml::from_str(
            r#"
            [site]
            base_url = "https://ds.example.com/"
            username = "bob"
            domain = "Corp"

            [auth]
            password_source = "env"
            password_env = "DS_PW"
            js_interpreter = "/opt/node/bin/node"
            login_attempts = 1

            [network]
            timeout_secs = 10
            max_retries = 5
            retry_base_delay_ms = 100

            [download]
            directory = "/tmp/ds"
            concurrency = 2
            overwrite = true
            layout = "tree"
            collection_title_as_directory_name = false
            "#,
        )
        .unwrap();
        assert_eq!(config.auth.password_source, PasswordSource::Env);
        assert_eq!(config.auth.js_interpreter, PathBuf::from("/opt/node/bin/node"));
        assert_eq!(config.download.layout, DownloadLayout::Tree);
        assert_eq!(config.download_directory(), PathBuf::from("/tmp/ds"));
        assert_eq!(config.retry_policy().max_attempts(), 5);
        assert_eq!(config.http_settings().timeout, Duration::from_secs(10));
        assert_eq!(config.session_settings().domain, "Corp");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = Config::default();
        config.site.base_url = "https://ds.example.com/".into();
        config.download.layout = DownloadLayout::Flatten;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.site.base_url, "https://ds.example.com/");
        assert_eq!(loaded.download.layout, DownloadLayout::Flatten);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
        assert!(Config::load_or_default(&path).is_ok());
    }
}

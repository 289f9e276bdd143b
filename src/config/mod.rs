//! Configuration module for docushare-dl.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - CLI argument parsing and merging
//! - Configuration validation

pub mod loader;
pub mod modes;
pub mod validation;

pub use loader::{AuthConfig, Config, DownloadConfig, NetworkConfig, SiteConfig, CONFIG_FILE_NAME};
pub use modes::{DownloadLayout, PasswordSource};
pub use validation::{validate_base_url, validate_config};

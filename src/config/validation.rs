//! Configuration validation logic.

use url::Url;

use crate::config::loader::Config;
use crate::config::modes::PasswordSource;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_base_url(&config.site.base_url)?;
    validate_username(config)?;
    validate_limits(config)?;

    if config.auth.password_source == PasswordSource::Env && config.auth.password_env.trim().is_empty()
    {
        return Err(Error::MissingConfig("auth.password_env".to_string()));
    }

    Ok(())
}

/// Validate the site base URL.
pub fn validate_base_url(base_url: &str) -> Result<()> {
    if base_url.trim().is_empty() {
        return Err(Error::MissingConfig("site.base_url".to_string()));
    }

    let url = Url::parse(base_url.trim()).map_err(|e| Error::ConfigValidation {
        field: "site.base_url".to_string(),
        message: format!("'{}' is not a valid URL: {}", base_url, e),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::ConfigValidation {
            field: "site.base_url".to_string(),
            message: format!("Scheme must be http or https (got {})", url.scheme()),
        });
    }

    if url.host_str().is_none() {
        return Err(Error::ConfigValidation {
            field: "site.base_url".to_string(),
            message: format!("'{}' has no host", base_url),
        });
    }

    Ok(())
}

/// A username is required unless it can be prompted for.
fn validate_username(config: &Config) -> Result<()> {
    if config.site.username.trim().is_empty() && config.auth.password_source != PasswordSource::Prompt
    {
        return Err(Error::MissingConfig(format!(
            "site.username (required with password_source = \"{}\")",
            config.auth.password_source
        )));
    }
    Ok(())
}

fn validate_limits(config: &Config) -> Result<()> {
    let checks = [
        ("auth.login_attempts", config.auth.login_attempts as u64),
        ("network.timeout_secs", config.network.timeout_secs),
        ("network.connect_timeout_secs", config.network.connect_timeout_secs),
        ("network.max_retries", config.network.max_retries as u64),
        ("network.max_concurrent_fetches", config.network.max_concurrent_fetches as u64),
        ("download.concurrency", config.download.concurrency as u64),
    ];

    for (field, value) in checks {
        if value == 0 {
            return Err(Error::ConfigValidation {
                field: field.to_string(),
                message: "Must be greater than zero".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.site.base_url = "https://ds.example.com/docushare".to_string();
        config.site.username = "alice".to_string();
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_base_url() {
        assert!(validate_base_url("https://ds.example.com/").is_ok());
        assert!(matches!(validate_base_url(""), Err(Error::MissingConfig(_))));
        assert!(validate_base_url("ftp://ds.example.com/").is_err());
        assert!(validate_base_url("not a url").is_err());
    }

    #[test]
    fn test_username_required_for_keyring() {
        let mut config = valid_config();
        config.site.username.clear();
        assert!(validate_config(&config).is_ok());

        config.auth.password_source = PasswordSource::Keyring;
        assert!(matches!(validate_config(&config), Err(Error::MissingConfig(_))));
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = valid_config();
        config.download.concurrency = 0;
        assert!(matches!(
            validate_config(&config),
            Err(Error::ConfigValidation { field, .. }) if field == "download.concurrency"
        ));
    }
}

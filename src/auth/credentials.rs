//! Credential sources used by the session manager.

use std::fmt;
use std::io::Write;

use console::Term;

use crate::error::{Error, Result};

/// A username and password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Supplies credentials for (re-)login.
pub trait CredentialSource: Send + Sync {
    /// Produce the credentials for the next login attempt.
    fn credentials(&self) -> Result<Credentials>;

    /// Called after the site accepted `credentials`.
    fn accept(&self, _credentials: &Credentials) {}

    /// Called after the site rejected `credentials`.
    ///
    /// Returns `true` if asking again may yield different credentials.
    fn reject(&self, _credentials: &Credentials) -> bool {
        false
    }
}

/// Fixed credentials.
#[derive(Debug, Clone)]
pub struct StaticCredentials(Credentials);

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self(Credentials::new(username, password))
    }
}

impl CredentialSource for StaticCredentials {
    fn credentials(&self) -> Result<Credentials> {
        Ok(self.0.clone())
    }
}

/// Password read from an environment variable on every login.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    username: String,
    variable: String,
}

impl EnvCredentials {
    pub fn new(username: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            variable: variable.into(),
        }
    }
}

impl CredentialSource for EnvCredentials {
    fn credentials(&self) -> Result<Credentials> {
        let password = std::env::var(&self.variable).map_err(|_| {
            Error::MissingConfig(format!("password (environment variable {})", self.variable))
        })?;
        Ok(Credentials::new(self.username.clone(), password))
    }
}

/// Asks on the terminal.
#[derive(Debug, Clone)]
pub struct PromptCredentials {
    site: String,
    username: Option<String>,
}

impl PromptCredentials {
    /// `username` of `None` prompts for it as well.
    pub fn new(site: impl Into<String>, username: Option<String>) -> Self {
        Self {
            site: site.into(),
            username,
        }
    }

    fn prompt_username(&self, term: &Term) -> Result<String> {
        if let Some(username) = &self.username {
            return Ok(username.clone());
        }
        term.write_line(&format!("Enter your username for {}", self.site))?;
        term.write_str("Username: ")?;
        let username = term.read_line()?.trim().to_string();
        if username.is_empty() {
            return Err(Error::Authentication("No username entered".to_string()));
        }
        Ok(username)
    }

    fn prompt_password(&self, term: &Term, username: &str) -> Result<String> {
        term.write_line(&format!(
            "Enter password of \"{}\" for {}",
            username, self.site
        ))?;
        term.write_str("Password: ")?;
        Ok(term.read_secure_line()?)
    }

    fn announce_rejection(&self, out: &mut impl Write) {
        if let Err(e) = writeln!(out, "Failed to login at {}.", self.site) {
            tracing::debug!("Could not report the failed login at {}: {}", self.site, e);
        }
    }
}

impl CredentialSource for PromptCredentials {
    fn credentials(&self) -> Result<Credentials> {
        let term = Term::stderr();
        let username = self.prompt_username(&term)?;
        let password = self.prompt_password(&term, &username)?;
        Ok(Credentials::new(username, password))
    }

    fn reject(&self, _credentials: &Credentials) -> bool {
        self.announce_rejection(&mut Term::stderr());
        true
    }
}

/// Password kept in the platform keyring, keyed by site and username.
///
/// Falls back to prompting when nothing is stored. A password is written to
/// the keyring once, after the site accepted it, and removed when rejected.
#[derive(Debug, Clone)]
pub struct KeyringCredentials {
    site: String,
    username: String,
    prompt: PromptCredentials,
}

impl KeyringCredentials {
    pub fn new(site: impl Into<String>, username: impl Into<String>) -> Self {
        let site = site.into();
        let username = username.into();
        let prompt = PromptCredentials::new(site.clone(), Some(username.clone()));
        Self {
            site,
            username,
            prompt,
        }
    }

    fn entry(&self) -> Option<keyring::Entry> {
        match keyring::Entry::new(&self.site, &self.username) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("Keyring unavailable: {}", e);
                None
            }
        }
    }

    fn stored_password(&self) -> Option<String> {
        self.entry()?.get_password().ok()
    }
}

impl CredentialSource for KeyringCredentials {
    fn credentials(&self) -> Result<Credentials> {
        if let Some(password) = self.stored_password() {
            tracing::info!("Found stored password of \"{}\" for {}", self.username, self.site);
            return Ok(Credentials::new(self.username.clone(), password));
        }
        self.prompt.credentials()
    }

    fn accept(&self, credentials: &Credentials) {
        if self.stored_password().as_deref() == Some(credentials.password.as_str()) {
            return;
        }
        let Some(entry) = self.entry() else {
            return;
        };
        match entry.set_password(&credentials.password) {
            Ok(()) => tracing::info!("Stored password of \"{}\" for {}", self.username, self.site),
            Err(e) => tracing::warn!("Could not store password in keyring: {}", e),
        }
    }

    fn reject(&self, credentials: &Credentials) -> bool {
        if let Some(entry) = self.entry() {
            if entry.delete_credential().is_ok() {
                tracing::info!("Deleted password of \"{}\" for {}", self.username, self.site);
            }
        }
        self.prompt.reject(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("alice", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_static_credentials_do_not_retry() {
        let source = StaticCredentials::new("alice", "secret");
        let creds = source.credentials().unwrap();
        assert_eq!(creds, Credentials::new("alice", "secret"));
        assert!(!source.reject(&creds));
    }

    #[test]
    fn test_env_credentials() {
        let var = "DOCUSHARE_DL_TEST_PASSWORD_ENV";
        std::env::set_var(var, "from-env");
        let source = EnvCredentials::new("bob", var);
        assert_eq!(source.credentials().unwrap().password, "from-env");

        std::env::remove_var(var);
        assert!(matches!(source.credentials(), Err(Error::MissingConfig(_))));
    }

    struct BrokenPipe;

    impl std::io::Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn test_prompt_rejection_survives_closed_terminal() {
        let source = PromptCredentials::new("https://ds.example.com/docushare/", None);
        source.announce_rejection(&mut BrokenPipe);
        assert!(source.reject(&Credentials::new("alice", "wrong")));
    }
}

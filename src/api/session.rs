//! Login and session lifecycle.
//!
//! Login is a challenge-response handshake: the login page carries a nonce
//! and references a challenge script; the script is evaluated with the
//! password and nonce, and the result is posted back instead of the password.
//! A successful login leaves an `AmberUser` cookie in the jar.
//!
//! Authenticated requests go through [`SessionManager::fetch_page`], which
//! recovers from a lost session with exactly one re-login and one retry.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::api::client::{Page, Resource, Transport};
use crate::api::retry::RetryPolicy;
use crate::auth::{compose_challenge_script, CredentialSource, Credentials, ScriptEvaluator};
use crate::error::{Error, Result};
use crate::html::{has_login_form, parse_login_page};

/// Cookie set by the server once a login succeeded.
pub const SESSION_COOKIE: &str = "AmberUser";

/// Default number of credential attempts per login.
pub const DEFAULT_LOGIN_ATTEMPTS: u32 = 3;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    /// Login page and challenge script were retrieved.
    ChallengeFetched,
    /// The challenge script produced a response token.
    ResponseComputed,
    Authenticated,
    /// The server dropped a previously valid session.
    Expired,
}

/// Login-related settings.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Authentication domain posted with the login form.
    pub domain: String,
    /// Credential attempts before a login gives up.
    pub login_attempts: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            domain: "DocuShare".to_string(),
            login_attempts: DEFAULT_LOGIN_ATTEMPTS,
        }
    }
}

struct SessionInner {
    state: SessionState,
    /// Incremented by each successful login.
    epoch: u64,
    username: Option<String>,
    source: Option<Arc<dyn CredentialSource>>,
}

enum Handshake {
    Accepted,
    Rejected(String),
}

/// Owns the login state shared by all requests of one client.
pub struct SessionManager {
    transport: Arc<Transport>,
    evaluator: Arc<dyn ScriptEvaluator>,
    settings: SessionSettings,
    retry: RetryPolicy,
    inner: RwLock<SessionInner>,
    /// Serializes logins so concurrent expiry triggers one re-login.
    login_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<Transport>,
        evaluator: Arc<dyn ScriptEvaluator>,
        settings: SessionSettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            evaluator,
            settings,
            retry,
            inner: RwLock::new(SessionInner {
                state: SessionState::Unauthenticated,
                epoch: 0,
                username: None,
                source: None,
            }),
            login_lock: Mutex::new(()),
        }
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub async fn state(&self) -> SessionState {
        self.inner.read().await.state
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state().await == SessionState::Authenticated
    }

    /// Username of the current or last session.
    pub async fn username(&self) -> Option<String> {
        self.inner.read().await.username.clone()
    }

    /// Log in with credentials from `source`.
    ///
    /// The source is kept for transparent re-login after session loss.
    pub async fn login(&self, source: Arc<dyn CredentialSource>) -> Result<()> {
        let _guard = self.login_lock.lock().await;
        self.login_locked(source).await.map(|_| ())
    }

    /// Forget the session and its credential source.
    pub async fn logout(&self) -> Result<()> {
        let _guard = self.login_lock.lock().await;
        self.transport.reset_cookies().await?;
        let mut inner = self.inner.write().await;
        inner.state = SessionState::Unauthenticated;
        inner.username = None;
        inner.source = None;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Return the epoch of a valid session, logging in again if it expired.
    pub async fn ensure_session(&self) -> Result<u64> {
        if let Some(epoch) = self.authenticated_epoch().await {
            return Ok(epoch);
        }

        let _guard = self.login_lock.lock().await;
        // Another task may have logged in while we waited.
        if let Some(epoch) = self.authenticated_epoch().await {
            return Ok(epoch);
        }

        let source = self.inner.read().await.source.clone().ok_or_else(|| {
            Error::Authentication("Not logged in; call login first".to_string())
        })?;
        tracing::info!("Session expired, logging in again");
        self.login_locked(source).await
    }

    /// Mark the session of `epoch` as lost.
    ///
    /// A newer session is left alone.
    pub async fn mark_expired(&self, epoch: u64) {
        let mut inner = self.inner.write().await;
        if inner.epoch == epoch && inner.state == SessionState::Authenticated {
            tracing::debug!("Session {} expired", epoch);
            inner.state = SessionState::Expired;
        }
    }

    /// Re-establish the session after `epoch` was found expired.
    ///
    /// Failure is an authentication error.
    pub async fn recover(&self, epoch: u64) -> Result<u64> {
        self.mark_expired(epoch).await;
        self.ensure_session().await.map_err(|e| match e {
            Error::Authentication(msg) => Error::Authentication(msg),
            other => Error::Authentication(format!("Re-login failed: {}", other)),
        })
    }

    /// GET an authenticated page and check it is the requested content.
    ///
    /// Transient network failures are retried. A lost session triggers one
    /// re-login and one retry; losing it again is an authentication error.
    pub async fn fetch_page(&self, url: &Url) -> Result<Page> {
        let epoch = self.ensure_session().await?;
        match self.fetch_checked(url).await {
            Err(Error::SessionExpired) => {
                self.recover(epoch).await?;
                match self.fetch_checked(url).await {
                    Err(Error::SessionExpired) => Err(Error::Authentication(format!(
                        "Session lost again right after re-login while fetching {}",
                        url
                    ))),
                    result => result,
                }
            }
            result => result,
        }
    }

    async fn fetch_checked(&self, url: &Url) -> Result<Page> {
        let username = self.username().await.unwrap_or_default();
        let username = username.as_str();
        self.retry
            .run(url.as_str(), || async move {
                let page = self.transport.get_page(url).await?;
                self.transport.check(&page, username)?;
                Ok(page)
            })
            .await
    }

    async fn authenticated_epoch(&self) -> Option<u64> {
        let inner = self.inner.read().await;
        (inner.state == SessionState::Authenticated).then_some(inner.epoch)
    }

    async fn set_state(&self, state: SessionState) {
        self.inner.write().await.state = state;
    }

    /// Run the handshake until it succeeds or the source gives up.
    /// Caller holds `login_lock`.
    async fn login_locked(&self, source: Arc<dyn CredentialSource>) -> Result<u64> {
        let mut attempts_left = self.settings.login_attempts.max(1);
        loop {
            let credentials = fetch_credentials(source.clone()).await?;
            tracing::info!("Logging in as \"{}\"", credentials.username);

            let handshake = self.handshake(&credentials).await;
            match handshake {
                Ok(Handshake::Accepted) => {
                    source.accept(&credentials);
                    let mut inner = self.inner.write().await;
                    inner.state = SessionState::Authenticated;
                    inner.epoch += 1;
                    inner.username = Some(credentials.username.clone());
                    inner.source = Some(source);
                    tracing::info!("Logged in as \"{}\"", credentials.username);
                    return Ok(inner.epoch);
                }
                Ok(Handshake::Rejected(reason)) => {
                    attempts_left -= 1;
                    tracing::warn!("Login as \"{}\" rejected: {}", credentials.username, reason);
                    if attempts_left == 0 || !source.reject(&credentials) {
                        self.set_state(SessionState::Unauthenticated).await;
                        return Err(Error::Authentication(format!(
                            "Login as \"{}\" failed: {}",
                            credentials.username, reason
                        )));
                    }
                }
                Err(e) => {
                    self.set_state(SessionState::Unauthenticated).await;
                    return Err(match e {
                        Error::Authentication(_) => e,
                        other => Error::Authentication(format!("Login failed: {}", other)),
                    });
                }
            }
        }
    }

    async fn handshake(&self, credentials: &Credentials) -> Result<Handshake> {
        self.transport.reset_cookies().await?;

        let login_url = self.transport.url(Resource::Login)?;
        let page = self.get_ok(&login_url).await?;
        let login = parse_login_page(&page.body)?;

        let script_url = page.final_url.join(&login.challenge_src)?;
        let script = self.get_ok(&script_url).await?;
        self.set_state(SessionState::ChallengeFetched).await;

        let composed =
            compose_challenge_script(&script.body, &credentials.password, &login.login_token)?;
        let response = evaluate(self.evaluator.clone(), composed, login.login_token.clone()).await?;
        self.set_state(SessionState::ResponseComputed).await;

        let apply_url = self.transport.url(Resource::ApplyLogin)?;
        let form = [
            ("response", response.as_str()),
            ("login_token", login.login_token.as_str()),
            ("bookmark", ""),
            ("username", credentials.username.as_str()),
            ("password", ""),
            ("domain", self.settings.domain.as_str()),
            ("Login", "Login"),
        ];
        let answer = self.transport.post_form(&apply_url, &form).await?;

        if self.transport.has_cookie(SESSION_COOKIE).await {
            return Ok(Handshake::Accepted);
        }

        let reason = if has_login_form(&answer.body) {
            "the server returned the login form again".to_string()
        } else {
            format!("no {} cookie in the response (HTTP {})", SESSION_COOKIE, answer.status)
        };
        Ok(Handshake::Rejected(reason))
    }

    /// GET an unauthenticated page, retrying transient failures.
    async fn get_ok(&self, url: &Url) -> Result<Page> {
        self.retry
            .run(url.as_str(), || async move {
                let page = self.transport.get_page(url).await?;
                match page.status {
                    200..=299 => Ok(page),
                    status if status >= 500 => {
                        Err(Error::Network(format!("HTTP {} from {}", status, url)))
                    }
                    status => Err(Error::HttpStatus {
                        status,
                        url: url.to_string(),
                    }),
                }
            })
            .await
    }
}

/// Credential sources may block on terminal input.
async fn fetch_credentials(source: Arc<dyn CredentialSource>) -> Result<Credentials> {
    tokio::task::spawn_blocking(move || source.credentials())
        .await
        .map_err(|e| Error::Authentication(format!("Credential source failed: {}", e)))?
}

/// Evaluators may spawn an interpreter process.
async fn evaluate(
    evaluator: Arc<dyn ScriptEvaluator>,
    script: String,
    nonce: String,
) -> Result<String> {
    tokio::task::spawn_blocking(move || evaluator.evaluate(&script, &nonce))
        .await
        .map_err(|e| Error::Authentication(format!("Challenge evaluation failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::HttpSettings;
    use crate::auth::StaticCredentials;
    use crate::html::DefaultClassifier;

    fn manager() -> SessionManager {
        let transport = Transport::new(
            "http://127.0.0.1:9/docushare/",
            HttpSettings::default(),
            Arc::new(DefaultClassifier),
        )
        .unwrap();
        let evaluator = |_: &str, nonce: &str| -> Result<String> { Ok(nonce.to_string()) };
        SessionManager::new(
            Arc::new(transport),
            Arc::new(evaluator),
            SessionSettings::default(),
            RetryPolicy::none(),
        )
    }

    #[tokio::test]
    async fn test_starts_unauthenticated() {
        let session = manager();
        assert_eq!(session.state().await, SessionState::Unauthenticated);
        assert!(!session.is_authenticated().await);
        assert_eq!(session.username().await, None);
    }

    #[tokio::test]
    async fn test_ensure_session_without_login() {
        let session = manager();
        assert!(matches!(
            session.ensure_session().await,
            Err(Error::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_mark_expired_ignores_other_epochs() {
        let session = manager();
        {
            let mut inner = session.inner.write().await;
            inner.state = SessionState::Authenticated;
            inner.epoch = 2;
        }
        session.mark_expired(1).await;
        assert_eq!(session.state().await, SessionState::Authenticated);
        session.mark_expired(2).await;
        assert_eq!(session.state().await, SessionState::Expired);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_authentication_error() {
        let session = manager();
        let result = session
            .login(Arc::new(StaticCredentials::new("alice", "secret")))
            .await;
        assert!(matches!(result, Err(Error::Authentication(_))));
        assert_eq!(session.state().await, SessionState::Unauthenticated);
    }
}

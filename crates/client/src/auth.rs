//! External authentication provider.
//!
//! Credential checks are fully delegated: the client never stores or hashes
//! passwords. A provider hands back an [`Identity`] on success and keeps the
//! most recent identity available via `current_identity`, mirroring how
//! hosted auth SDKs cache the signed-in user on the client.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use abshine_core::Email;

use crate::config::AuthConfig;

/// Errors that can occur during provider operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email/password combination.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account already exists for this email.
    #[error("email already in use")]
    EmailAlreadyInUse,

    /// The provider rejected the password.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// The provider is unreachable or returned an unexpected response.
    #[error("authentication service unavailable: {0}")]
    Unavailable(String),
}

/// An authenticated identity as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The account's email address.
    pub email: Email,
}

/// Credential management delegated to an external service.
pub trait AuthProvider {
    /// Create a new account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailAlreadyInUse`] or [`AuthError::WeakPassword`]
    /// when the provider rejects the account, and [`AuthError::Unavailable`]
    /// when it cannot be reached.
    async fn create_account(&self, email: &Email, password: &str) -> Result<Identity, AuthError>;

    /// Check credentials for an existing account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for a wrong email/password
    /// combination and [`AuthError::Unavailable`] when the provider cannot
    /// be reached.
    async fn authenticate(&self, email: &Email, password: &str) -> Result<Identity, AuthError>;

    /// The identity most recently authenticated on this client, if any.
    fn current_identity(&self) -> Option<Identity>;
}

impl<A: AuthProvider> AuthProvider for Arc<A> {
    async fn create_account(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        (**self).create_account(email, password).await
    }

    async fn authenticate(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        (**self).authenticate(email, password).await
    }

    fn current_identity(&self) -> Option<Identity> {
        (**self).current_identity()
    }
}

// =============================================================================
// HttpAuthProvider
// =============================================================================

/// Error body returned by the provider on 4xx responses.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// HTTP client for the hosted authentication provider.
#[derive(Clone)]
pub struct HttpAuthProvider {
    inner: Arc<HttpAuthProviderInner>,
}

struct HttpAuthProviderInner {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    current: std::sync::Mutex<Option<Identity>>,
}

impl HttpAuthProvider {
    /// Create a new provider client.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            inner: Arc::new(HttpAuthProviderInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.as_str().trim_end_matches('/').to_owned(),
                api_key: config.api_key.expose_secret().to_owned(),
                current: std::sync::Mutex::new(None),
            }),
        }
    }

    async fn post_credentials(
        &self,
        path: &str,
        email: &Email,
        password: &str,
    ) -> Result<reqwest::Response, AuthError> {
        self.inner
            .client
            .post(format!("{}/{path}", self.inner.base_url))
            .bearer_auth(&self.inner.api_key)
            .json(&serde_json::json!({
                "email": email.as_str(),
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))
    }

    fn remember(&self, identity: &Identity) {
        let mut current = self
            .inner
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *current = Some(identity.clone());
    }

    /// Decode a 4xx error body into the matching [`AuthError`].
    async fn error_for(response: reqwest::Response) -> AuthError {
        let status = response.status().as_u16();
        let body: ProviderErrorBody = response.json().await.unwrap_or(ProviderErrorBody {
            code: String::new(),
            message: String::new(),
        });

        match (status, body.code.as_str()) {
            (409, _) | (_, "email-already-in-use") => AuthError::EmailAlreadyInUse,
            (_, "weak-password") => AuthError::WeakPassword(body.message),
            (400 | 401 | 403 | 404, _) => AuthError::InvalidCredentials,
            _ => AuthError::Unavailable(format!("HTTP {status}")),
        }
    }
}

impl AuthProvider for HttpAuthProvider {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn create_account(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        let response = self.post_credentials("signup", email, password).await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let identity = Identity {
            email: email.clone(),
        };
        self.remember(&identity);
        Ok(identity)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn authenticate(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        let response = self.post_credentials("signin", email, password).await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let identity = Identity {
            email: email.clone(),
        };
        self.remember(&identity);
        Ok(identity)
    }

    fn current_identity(&self) -> Option<Identity> {
        self.inner
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

// =============================================================================
// MemoryAuthProvider
// =============================================================================

/// In-memory provider for tests, offline demos, and local development.
///
/// Accounts are a plain email→password map. `request_count` counts every
/// `create_account`/`authenticate` call so tests can assert that validation
/// failures never reach the network.
#[derive(Default)]
pub struct MemoryAuthProvider {
    accounts: std::sync::Mutex<std::collections::HashMap<String, String>>,
    current: std::sync::Mutex<Option<Identity>>,
    requests: AtomicU64,
}

impl MemoryAuthProvider {
    /// Create a provider with no accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account directly, bypassing the async interface (test setup).
    pub fn seed_account(&self, email: &str, password: &str) {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        accounts.insert(email.to_owned(), password.to_owned());
    }

    /// Number of credential requests made so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    fn remember(&self, identity: &Identity) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = Some(identity.clone());
    }
}

impl AuthProvider for MemoryAuthProvider {
    async fn create_account(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        if accounts.contains_key(email.as_str()) {
            return Err(AuthError::EmailAlreadyInUse);
        }
        accounts.insert(email.as_str().to_owned(), password.to_owned());
        drop(accounts);

        let identity = Identity {
            email: email.clone(),
        };
        self.remember(&identity);
        Ok(identity)
    }

    async fn authenticate(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        let stored = accounts
            .get(email.as_str())
            .ok_or(AuthError::InvalidCredentials)?;
        if stored != password {
            return Err(AuthError::InvalidCredentials);
        }
        drop(accounts);

        let identity = Identity {
            email: email.clone(),
        };
        self.remember(&identity);
        Ok(identity)
    }

    fn current_identity(&self) -> Option<Identity> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_memory_create_then_authenticate() {
        let provider = MemoryAuthProvider::new();
        provider
            .create_account(&email("ana@x.com"), "secreta1")
            .await
            .unwrap();

        let identity = provider
            .authenticate(&email("ana@x.com"), "secreta1")
            .await
            .unwrap();
        assert_eq!(identity.email.as_str(), "ana@x.com");
        assert_eq!(provider.current_identity().unwrap(), identity);
    }

    #[tokio::test]
    async fn test_memory_duplicate_account() {
        let provider = MemoryAuthProvider::new();
        provider.seed_account("ana@x.com", "secreta1");

        assert!(matches!(
            provider.create_account(&email("ana@x.com"), "otra123").await,
            Err(AuthError::EmailAlreadyInUse)
        ));
    }

    #[tokio::test]
    async fn test_memory_wrong_password() {
        let provider = MemoryAuthProvider::new();
        provider.seed_account("ana@x.com", "secreta1");

        assert!(matches!(
            provider.authenticate(&email("ana@x.com"), "equivocada").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(provider.current_identity().is_none());
    }

    #[tokio::test]
    async fn test_memory_unknown_account() {
        let provider = MemoryAuthProvider::new();
        assert!(matches!(
            provider.authenticate(&email("nadie@x.com"), "x").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_request_count() {
        let provider = MemoryAuthProvider::new();
        assert_eq!(provider.request_count(), 0);

        let _ = provider.authenticate(&email("ana@x.com"), "x").await;
        let _ = provider.create_account(&email("ana@x.com"), "secreta1").await;
        assert_eq!(provider.request_count(), 2);
    }
}

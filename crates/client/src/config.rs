//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ABSHINE_STORE_URL` - Base URL of the remote document store
//! - `ABSHINE_STORE_API_KEY` - API key for the document store
//! - `ABSHINE_AUTH_URL` - Base URL of the authentication provider
//! - `ABSHINE_AUTH_API_KEY` - API key for the authentication provider
//!
//! ## Optional
//! - `ABSHINE_DATA_DIR` - Directory for locally persisted state (default: `.abshine`)

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default directory for locally persisted cart/session state.
pub const DEFAULT_DATA_DIR: &str = ".abshine";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client application configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Remote document store (catalog + profiles).
    pub store: StoreConfig,
    /// Authentication provider.
    pub auth: AuthConfig,
    /// Directory for locally persisted state.
    pub data_dir: PathBuf,
}

/// Remote document store configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct StoreConfig {
    /// Base URL of the document store.
    pub base_url: Url,
    /// API key sent as a bearer token.
    pub api_key: SecretString,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Authentication provider configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct AuthConfig {
    /// Base URL of the authentication provider.
    pub base_url: Url,
    /// API key sent as a bearer token.
    pub api_key: SecretString,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            store: StoreConfig {
                base_url: get_url("ABSHINE_STORE_URL")?,
                api_key: get_required_secret("ABSHINE_STORE_API_KEY")?,
            },
            auth: AuthConfig {
                base_url: get_url("ABSHINE_AUTH_URL")?,
                api_key: get_required_secret("ABSHINE_AUTH_API_KEY")?,
            },
            data_dir: PathBuf::from(get_env_or_default("ABSHINE_DATA_DIR", DEFAULT_DATA_DIR)),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get a required environment variable parsed as a URL.
fn get_url(key: &str) -> Result<Url, ConfigError> {
    let value = get_required_env(key)?;
    Url::parse(&value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

//! Remote document store access.
//!
//! The storefront reads its catalog and profile records from a remote
//! document store: keyed JSON records grouped into named collections
//! (`productos`, `usuarios`, `clientes`). The store's wire protocol is
//! plain request/response JSON; nothing here assumes live updates.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use secrecy::ExposeSecret;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::config::StoreConfig;

/// Errors that can occur talking to the document store.
#[derive(Debug, Error)]
pub enum DocStoreError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("document store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from the store.
    #[error("document store returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// Rate limited by the store.
    #[error("rate limited, retry after {0}s")]
    RateLimited(u64),

    /// Response body was not the expected JSON shape.
    #[error("failed to parse document store response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The store is unreachable (in-memory store in offline mode).
    #[error("document store unavailable")]
    Unavailable,
}

/// Keyed access to a remote document store.
///
/// Collections hold JSON records addressed by a string key (product id for
/// the catalog, email for profiles).
pub trait DocumentStore {
    /// Fetch the record stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DocStoreError`] when the store cannot be reached or replies
    /// with an unexpected response.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, DocStoreError>;

    /// Write `record` under `key`. With `merge`, top-level fields are merged
    /// into an existing record instead of replacing it.
    ///
    /// # Errors
    ///
    /// Returns [`DocStoreError`] when the store rejects the write.
    async fn set(
        &self,
        collection: &str,
        key: &str,
        record: &Value,
        merge: bool,
    ) -> Result<(), DocStoreError>;

    /// List every record in `collection` as `(key, record)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`DocStoreError`] when the store cannot be reached or the
    /// listing fails to decode.
    async fn list_all(&self, collection: &str) -> Result<Vec<(String, Value)>, DocStoreError>;
}

impl<D: DocumentStore> DocumentStore for Arc<D> {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, DocStoreError> {
        (**self).get(collection, key).await
    }

    async fn set(
        &self,
        collection: &str,
        key: &str,
        record: &Value,
        merge: bool,
    ) -> Result<(), DocStoreError> {
        (**self).set(collection, key, record, merge).await
    }

    async fn list_all(&self, collection: &str) -> Result<Vec<(String, Value)>, DocStoreError> {
        (**self).list_all(collection).await
    }
}

// =============================================================================
// HttpDocumentStore
// =============================================================================

/// HTTP client for the remote document store.
///
/// Records live at `{base_url}/{collection}/{key}`; a collection listing is a
/// JSON object mapping keys to records at `{base_url}/{collection}`.
#[derive(Clone)]
pub struct HttpDocumentStore {
    inner: Arc<HttpDocumentStoreInner>,
}

struct HttpDocumentStoreInner {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpDocumentStore {
    /// Create a new document store client.
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            inner: Arc::new(HttpDocumentStoreInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.as_str().trim_end_matches('/').to_owned(),
                api_key: config.api_key.expose_secret().to_owned(),
            }),
        }
    }

    fn document_url(&self, collection: &str, key: &str) -> String {
        format!("{}/{collection}/{key}", self.inner.base_url)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{collection}", self.inner.base_url)
    }

    /// Map a non-success response to a [`DocStoreError`].
    async fn error_for(response: reqwest::Response) -> DocStoreError {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return DocStoreError::RateLimited(retry_after);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!(
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "document store returned non-success status"
        );
        DocStoreError::Status {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        }
    }
}

impl DocumentStore for HttpDocumentStore {
    #[instrument(skip(self), fields(collection = %collection, key = %key))]
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, DocStoreError> {
        let response = self
            .inner
            .client
            .get(self.document_url(collection, key))
            .bearer_auth(&self.inner.api_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let record = response.json::<Value>().await?;
        Ok(Some(record))
    }

    #[instrument(skip(self, record), fields(collection = %collection, key = %key, merge))]
    async fn set(
        &self,
        collection: &str,
        key: &str,
        record: &Value,
        merge: bool,
    ) -> Result<(), DocStoreError> {
        let url = self.document_url(collection, key);
        let request = if merge {
            self.inner.client.patch(url)
        } else {
            self.inner.client.put(url)
        };

        let response = request
            .bearer_auth(&self.inner.api_key)
            .json(record)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(collection = %collection))]
    async fn list_all(&self, collection: &str) -> Result<Vec<(String, Value)>, DocStoreError> {
        let response = self
            .inner
            .client
            .get(self.collection_url(collection))
            .bearer_auth(&self.inner.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let records = response.json::<BTreeMap<String, Value>>().await?;
        Ok(records.into_iter().collect())
    }
}

// =============================================================================
// MemoryDocumentStore
// =============================================================================

/// In-memory document store for tests, offline demos, and local development.
///
/// `set_offline(true)` makes every operation fail with
/// [`DocStoreError::Unavailable`] to exercise degraded paths.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: std::sync::Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
    offline: AtomicBool,
}

impl MemoryDocumentStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated unavailability.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Insert a record directly, bypassing the async interface (test setup).
    pub fn insert(&self, collection: &str, key: &str, record: Value) {
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        collections
            .entry(collection.to_owned())
            .or_default()
            .insert(key.to_owned(), record);
    }

    fn check_online(&self) -> Result<(), DocStoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DocStoreError::Unavailable);
        }
        Ok(())
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, DocStoreError> {
        self.check_online()?;
        let collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        Ok(collections
            .get(collection)
            .and_then(|records| records.get(key))
            .cloned())
    }

    async fn set(
        &self,
        collection: &str,
        key: &str,
        record: &Value,
        merge: bool,
    ) -> Result<(), DocStoreError> {
        self.check_online()?;
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        let records = collections.entry(collection.to_owned()).or_default();

        if merge
            && let Some(Value::Object(existing)) = records.get_mut(key)
            && let Value::Object(incoming) = record
        {
            for (field, value) in incoming {
                existing.insert(field.clone(), value.clone());
            }
            return Ok(());
        }

        records.insert(key.to_owned(), record.clone());
        Ok(())
    }

    async fn list_all(&self, collection: &str) -> Result<Vec<(String, Value)>, DocStoreError> {
        self.check_online()?;
        let collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        Ok(collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .map(|(key, record)| (key.clone(), record.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

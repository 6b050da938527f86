//! Profile record access.
//!
//! Profiles live in the remote store's `usuarios` collection keyed by email;
//! free-form customer details (the profile screen's address fields) go to
//! `clientes` and are merged field-by-field on save.

use serde_json::Value;
use tracing::instrument;

use abshine_core::Email;

use crate::docstore::{DocStoreError, DocumentStore};
use crate::models::ProfileRecord;

/// Collection holding profile records.
pub const PROFILE_COLLECTION: &str = "usuarios";

/// Collection holding free-form customer details.
pub const CUSTOMER_COLLECTION: &str = "clientes";

/// Typed access to profile records in a document store.
pub struct ProfileRepository<'a, D> {
    store: &'a D,
}

impl<'a, D: DocumentStore> ProfileRepository<'a, D> {
    /// Create a repository over `store`.
    #[must_use]
    pub const fn new(store: &'a D) -> Self {
        Self { store }
    }

    /// Fetch the profile for `email`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DocStoreError`] if the store is unreachable or the record
    /// fails to decode.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn get(&self, email: &Email) -> Result<Option<ProfileRecord>, DocStoreError> {
        let Some(record) = self.store.get(PROFILE_COLLECTION, email.as_str()).await? else {
            return Ok(None);
        };
        let profile = serde_json::from_value(record)?;
        Ok(Some(profile))
    }

    /// Write a new profile record.
    ///
    /// # Errors
    ///
    /// Returns [`DocStoreError`] if the store rejects the write.
    #[instrument(skip(self, profile), fields(email = %profile.email))]
    pub async fn create(&self, profile: &ProfileRecord) -> Result<(), DocStoreError> {
        let record = serde_json::to_value(profile)?;
        self.store
            .set(PROFILE_COLLECTION, profile.email.as_str(), &record, false)
            .await
    }

    /// Merge free-form customer details into the `clientes` record.
    ///
    /// # Errors
    ///
    /// Returns [`DocStoreError`] if the store rejects the write.
    #[instrument(skip(self, details), fields(email = %email))]
    pub async fn save_details(&self, email: &Email, details: &Value) -> Result<(), DocStoreError> {
        self.store
            .set(CUSTOMER_COLLECTION, email.as_str(), details, true)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use serde_json::json;

    use abshine_core::Role;

    use crate::docstore::MemoryDocumentStore;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryDocumentStore::new();
        let repo = ProfileRepository::new(&store);

        let profile = ProfileRecord {
            name: "Ana".to_owned(),
            email: email("ana@x.com"),
            role: Role::User,
        };
        repo.create(&profile).await.unwrap();

        let loaded = repo.get(&email("ana@x.com")).await.unwrap().unwrap();
        assert_eq!(loaded, profile);
    }

    #[tokio::test]
    async fn test_get_absent() {
        let store = MemoryDocumentStore::new();
        let repo = ProfileRepository::new(&store);
        assert!(repo.get(&email("nadie@x.com")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_details_merges() {
        let store = MemoryDocumentStore::new();
        let repo = ProfileRepository::new(&store);

        repo.save_details(&email("ana@x.com"), &json!({"provincia": "Córdoba"}))
            .await
            .unwrap();
        repo.save_details(&email("ana@x.com"), &json!({"telefono": "351-555"}))
            .await
            .unwrap();

        let record = store
            .get(CUSTOMER_COLLECTION, "ana@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record["provincia"], "Córdoba");
        assert_eq!(record["telefono"], "351-555");
    }
}

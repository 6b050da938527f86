//! Integration tests for the ABShine storefront client.
//!
//! Every scenario runs fully in-process against the in-memory document
//! store and authentication provider, so the suite needs no network and no
//! running services.
//!
//! Run with: `cargo test -p abshine-integration-tests`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use serde_json::json;

use abshine_client::auth::MemoryAuthProvider;
use abshine_client::catalog::CATALOG_COLLECTION;
use abshine_client::docstore::MemoryDocumentStore;
use abshine_client::storage::{MemoryStorage, Storage};
use abshine_client::storefront::Storefront;

/// Storefront wired to the in-memory collaborators.
pub type TestStorefront =
    Storefront<MemoryStorage, Arc<MemoryDocumentStore>, Arc<MemoryAuthProvider>>;

/// Shared collaborators for a test scenario.
///
/// The harness keeps its own handles to storage, store, and provider so a
/// test can "restart" the client (build a second storefront over the same
/// storage) or inspect remote state directly.
pub struct TestHarness {
    pub storage: MemoryStorage,
    pub store: Arc<MemoryDocumentStore>,
    pub auth: Arc<MemoryAuthProvider>,
}

impl TestHarness {
    /// A harness with an empty catalog and no accounts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage: MemoryStorage::new(),
            store: Arc::new(MemoryDocumentStore::new()),
            auth: Arc::new(MemoryAuthProvider::new()),
        }
    }

    /// A harness seeded with the standard demo catalog.
    #[must_use]
    pub fn with_demo_catalog() -> Self {
        let harness = Self::new();
        harness.seed_product("p1", "Limpiador multiuso", 100);
        harness.seed_product("p2", "Jabón líquido", 250);
        harness.seed_product("p3", "Lavandina concentrada", 650);
        harness
    }

    /// Insert a catalog record.
    pub fn seed_product(&self, id: &str, name: &str, price: i64) {
        self.store.insert(
            CATALOG_COLLECTION,
            id,
            json!({"name": name, "price": price}),
        );
    }

    /// Register an account and its profile record.
    pub fn seed_user(&self, name: &str, email: &str, password: &str, role: &str) {
        self.auth.seed_account(email, password);
        self.store.insert(
            "usuarios",
            email,
            json!({"name": name, "email": email, "role": role}),
        );
    }

    /// Build a storefront over the harness's shared storage.
    #[must_use]
    pub fn build(&self) -> TestStorefront {
        self.build_with(self.storage.clone())
    }

    /// Build a storefront over an explicit storage implementation.
    pub fn build_with<S: Storage>(
        &self,
        storage: S,
    ) -> Storefront<S, Arc<MemoryDocumentStore>, Arc<MemoryAuthProvider>> {
        Storefront::new(storage, Arc::clone(&self.store), Arc::clone(&self.auth))
    }

    /// Build a storefront with the catalog snapshot already installed.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory store is offline.
    pub async fn build_ready(&self) -> TestStorefront {
        let mut storefront = self.build();
        storefront
            .refresh_catalog()
            .await
            .expect("in-memory catalog fetch cannot fail while online");
        storefront
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

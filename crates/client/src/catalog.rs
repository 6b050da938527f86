//! Catalog snapshot loading.
//!
//! The catalog is fetched once as a whole: every load replaces the entire
//! snapshot, there is no incremental sync. Records that fail schema
//! validation are skipped with a warning rather than failing the load.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::instrument;

use abshine_core::ProductId;

use crate::docstore::{DocStoreError, DocumentStore};
use crate::models::Product;

/// Collection holding catalog records in the remote store.
pub const CATALOG_COLLECTION: &str = "productos";

/// Errors that can occur loading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The remote store could not be read; keep the previous (or empty)
    /// snapshot rather than crashing.
    #[error("catalog unavailable: {0}")]
    Unavailable(#[source] DocStoreError),
}

/// An immutable in-memory snapshot of the product catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: BTreeMap<ProductId, Product>,
}

impl Catalog {
    /// Build a snapshot from validated products.
    #[must_use]
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products
                .into_iter()
                .map(|product| (product.id.clone(), product))
                .collect(),
        }
    }

    /// Look up a product by id.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.get(id)
    }

    /// Number of products in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the snapshot holds no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Iterate products in id order.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }
}

/// Fetch a full catalog snapshot from the remote store.
///
/// # Errors
///
/// Returns [`CatalogError::Unavailable`] when the store cannot be read.
/// Individual malformed records are skipped, not fatal.
#[instrument(skip(store))]
pub async fn fetch_catalog<D: DocumentStore>(store: &D) -> Result<Catalog, CatalogError> {
    let records = store
        .list_all(CATALOG_COLLECTION)
        .await
        .map_err(CatalogError::Unavailable)?;

    let mut products = Vec::with_capacity(records.len());
    for (key, record) in records {
        let id = ProductId::new(key);
        match Product::from_record(id.clone(), &record) {
            Ok(product) => products.push(product),
            Err(error) => {
                tracing::warn!(product_id = %id, %error, "skipping malformed catalog record");
            }
        }
    }

    let catalog = Catalog::from_products(products);
    tracing::debug!(products = catalog.len(), "catalog snapshot loaded");
    Ok(catalog)
}

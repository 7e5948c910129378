//! Catalog access.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::ProductId;
use crate::services::auth::AuthToken;

/// Read access to products plus the authenticated stock write used after
/// a captured payment.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Current catalog entry for `id`, including live stock.
    async fn product(&self, id: &ProductId) -> Result<Product, CatalogError>;

    /// All products, or only those in `category`.
    async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, CatalogError>;

    async fn search(&self, query: &str) -> Result<Vec<Product>, CatalogError>;

    async fn categories(&self) -> Result<Vec<String>, CatalogError>;

    /// Overwrites the stock count of `id`. Last write wins.
    async fn update_stock(&self, id: &ProductId, new_stock: u32, token: &AuthToken) -> Result<(), CatalogError>;
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("not authorized")]
    Unauthorized,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("failed to parse response: {0}")]
    Decode(String),

    #[error("catalog rejected the request: {0}")]
    Rejected(String),
}

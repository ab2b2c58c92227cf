use std::sync::Arc;

use async_trait::async_trait;

use crate::{ProductId, ProductSnapshot, TransportError};

/// A single, unguarded lookup against the catalog.
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    /// Performs exactly one attempt to load a product.
    async fn get_product(&self, product_id: ProductId) -> Result<ProductSnapshot, TransportError>;
}

#[async_trait]
impl<T: CatalogTransport + ?Sized> CatalogTransport for Arc<T> {
    async fn get_product(&self, product_id: ProductId) -> Result<ProductSnapshot, TransportError> {
        (**self).get_product(product_id).await
    }
}

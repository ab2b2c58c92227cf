//! Stock administration.

use common::ProductId;
use store::{InventoryLedger, InventoryRecord};

use crate::error::{PurchaseError, Result};

/// Reads and overwrites stock levels outside of a purchase.
pub struct StockService<L: InventoryLedger> {
    ledger: L,
}

impl<L: InventoryLedger> StockService<L> {
    /// Creates a new stock service.
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Returns the ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Returns the stock record for a product, creating an empty one if needed.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, product_id: ProductId) -> Result<InventoryRecord> {
        Ok(self.ledger.get_or_create(product_id).await?)
    }

    /// Overwrites the stock level of a product.
    ///
    /// Negative quantities are rejected before the ledger is called.
    #[tracing::instrument(skip(self))]
    pub async fn set(&self, product_id: ProductId, quantity: i64) -> Result<InventoryRecord> {
        if quantity < 0 {
            return Err(PurchaseError::InvalidArgument(
                "quantity must be >= 0".to_string(),
            ));
        }

        let record = self.ledger.set(product_id, quantity).await?;
        tracing::info!(quantity = record.quantity, version = record.version, "stock set");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::InMemoryInventoryLedger;

    fn setup() -> StockService<InMemoryInventoryLedger> {
        StockService::new(InMemoryInventoryLedger::new())
    }

    #[tokio::test]
    async fn test_get_creates_empty_record() {
        let service = setup();

        let record = service.get(ProductId::new(5)).await.unwrap();
        assert_eq!(record.product_id, ProductId::new(5));
        assert_eq!(record.quantity, 0);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let service = setup();

        service.set(ProductId::new(5), 12).await.unwrap();
        let record = service.get(ProductId::new(5)).await.unwrap();
        assert_eq!(record.quantity, 12);
    }

    #[tokio::test]
    async fn test_negative_set_never_reaches_ledger() {
        let service = setup();

        let result = service.set(ProductId::new(5), -1).await;
        assert!(matches!(result, Err(PurchaseError::InvalidArgument(_))));
        assert_eq!(service.ledger().set_calls(), 0);
    }

    #[tokio::test]
    async fn test_set_zero_is_allowed() {
        let service = setup();

        let record = service.set(ProductId::new(5), 0).await.unwrap();
        assert_eq!(record.quantity, 0);
    }
}

use std::sync::Arc;

use async_trait::async_trait;

use crate::{IdempotencyKey, IdempotencyRecord, InventoryRecord, ProductId, Result};

/// Per-product stock ledger.
///
/// All implementations must be thread-safe (Send + Sync). The only operation
/// that coordinates concurrent purchasers is [`decrement_if_enough`], and it
/// must be atomic in the storage layer itself.
///
/// [`decrement_if_enough`]: InventoryLedger::decrement_if_enough
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Returns the record for a product, creating it with zero stock if absent.
    ///
    /// Concurrent first access must not insert two rows.
    async fn get_or_create(&self, product_id: ProductId) -> Result<InventoryRecord>;

    /// Overwrites the stock level of a product, creating the record if needed.
    ///
    /// Fails with `NegativeQuantity` if `quantity < 0`; the value is never clamped.
    async fn set(&self, product_id: ProductId, quantity: i64) -> Result<InventoryRecord>;

    /// Atomically subtracts `quantity` if at least that much is in stock.
    ///
    /// Returns whether the decrement happened. A product without a record has
    /// no stock, so the answer is `false`. Two concurrent callers on the same
    /// product always observe a serialized quantity.
    async fn decrement_if_enough(&self, product_id: ProductId, quantity: i64) -> Result<bool>;
}

/// Key to response cache for idempotent purchase requests.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Returns the stored response for a key, if any.
    async fn lookup(&self, key: &IdempotencyKey) -> Result<Option<String>>;

    /// Stores the response for a key.
    ///
    /// Returns `false` without touching the existing value when the key is
    /// already present; a stored response is never replaced.
    async fn record(&self, key: &IdempotencyKey, response: &str) -> Result<bool>;

    /// Returns the full stored record for a key, including its creation time.
    async fn get_record(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>>;
}

#[async_trait]
impl<T: InventoryLedger + ?Sized> InventoryLedger for Arc<T> {
    async fn get_or_create(&self, product_id: ProductId) -> Result<InventoryRecord> {
        (**self).get_or_create(product_id).await
    }

    async fn set(&self, product_id: ProductId, quantity: i64) -> Result<InventoryRecord> {
        (**self).set(product_id, quantity).await
    }

    async fn decrement_if_enough(&self, product_id: ProductId, quantity: i64) -> Result<bool> {
        (**self).decrement_if_enough(product_id, quantity).await
    }
}

#[async_trait]
impl<T: IdempotencyStore + ?Sized> IdempotencyStore for Arc<T> {
    async fn lookup(&self, key: &IdempotencyKey) -> Result<Option<String>> {
        (**self).lookup(key).await
    }

    async fn record(&self, key: &IdempotencyKey, response: &str) -> Result<bool> {
        (**self).record(key, response).await
    }

    async fn get_record(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>> {
        (**self).get_record(key).await
    }
}

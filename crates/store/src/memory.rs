use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    IdempotencyKey, IdempotencyRecord, InventoryRecord, ProductId, Result, StoreError,
    store::{IdempotencyStore, InventoryLedger},
};

/// In-memory stock ledger.
///
/// The check and the subtraction of a decrement happen under one write guard,
/// which makes the operation atomic within the process. Call counters let
/// tests assert that no mutation was attempted.
#[derive(Clone, Default)]
pub struct InMemoryInventoryLedger {
    records: Arc<RwLock<HashMap<ProductId, InventoryRecord>>>,
    decrement_calls: Arc<AtomicUsize>,
    set_calls: Arc<AtomicUsize>,
}

impl InMemoryInventoryLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current quantity without creating a record.
    pub async fn quantity(&self, product_id: ProductId) -> Option<i64> {
        self.records.read().await.get(&product_id).map(|r| r.quantity)
    }

    /// Number of `decrement_if_enough` calls received so far.
    pub fn decrement_calls(&self) -> usize {
        self.decrement_calls.load(Ordering::SeqCst)
    }

    /// Number of `set` calls received so far.
    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryLedger for InMemoryInventoryLedger {
    async fn get_or_create(&self, product_id: ProductId) -> Result<InventoryRecord> {
        if let Some(record) = self.records.read().await.get(&product_id) {
            return Ok(*record);
        }

        // Re-check under the write guard; another task may have created it.
        let mut records = self.records.write().await;
        let record = records
            .entry(product_id)
            .or_insert_with(|| InventoryRecord::empty(product_id));
        Ok(*record)
    }

    async fn set(&self, product_id: ProductId, quantity: i64) -> Result<InventoryRecord> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if quantity < 0 {
            return Err(StoreError::NegativeQuantity {
                product_id,
                quantity,
            });
        }

        let mut records = self.records.write().await;
        let record = match records.entry(product_id) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                record.quantity = quantity;
                record.version += 1;
                *record
            }
            Entry::Vacant(entry) => *entry.insert(InventoryRecord {
                product_id,
                quantity,
                version: 0,
            }),
        };
        Ok(record)
    }

    async fn decrement_if_enough(&self, product_id: ProductId, quantity: i64) -> Result<bool> {
        self.decrement_calls.fetch_add(1, Ordering::SeqCst);
        if quantity <= 0 {
            return Err(StoreError::InvalidDecrement {
                product_id,
                quantity,
            });
        }

        let mut records = self.records.write().await;
        match records.get_mut(&product_id) {
            Some(record) if record.has_at_least(quantity) => {
                record.quantity -= quantity;
                record.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// In-memory idempotency store.
#[derive(Clone, Default)]
pub struct InMemoryIdempotencyStore {
    records: Arc<RwLock<HashMap<IdempotencyKey, IdempotencyRecord>>>,
    record_calls: Arc<AtomicUsize>,
}

impl InMemoryIdempotencyStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if no key has been stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Number of `record` calls received so far, including rejected duplicates.
    pub fn record_calls(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn lookup(&self, key: &IdempotencyKey) -> Result<Option<String>> {
        Ok(self
            .records
            .read()
            .await
            .get(key)
            .map(|r| r.response.clone()))
    }

    async fn record(&self, key: &IdempotencyKey, response: &str) -> Result<bool> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.write().await;
        match records.entry(key.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(IdempotencyRecord::new(key.clone(), response));
                Ok(true)
            }
        }
    }

    async fn get_record(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>> {
        Ok(self.records.read().await.get(key).cloned())
    }
}

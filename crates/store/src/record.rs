use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{IdempotencyKey, ProductId};

/// Stock level of a single product.
///
/// `quantity` is never negative. `version` is an opaque concurrency token that
/// changes on every mutation; callers must not interpret it beyond equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub product_id: ProductId,
    pub quantity: i64,
    pub version: i64,
}

impl InventoryRecord {
    /// A freshly created record: no stock, initial version.
    pub fn empty(product_id: ProductId) -> Self {
        Self {
            product_id,
            quantity: 0,
            version: 0,
        }
    }

    /// Returns true if at least `quantity` units are available.
    pub fn has_at_least(&self, quantity: i64) -> bool {
        self.quantity >= quantity
    }
}

/// A stored response for an idempotency key. Never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: IdempotencyKey,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    /// Creates a record stamped with the current time.
    pub fn new(key: IdempotencyKey, response: impl Into<String>) -> Self {
        Self {
            key,
            response: response.into(),
            created_at: Utc::now(),
        }
    }
}

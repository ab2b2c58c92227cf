//! Purchase request and result types.

use catalog::ProductSnapshot;
use chrono::{DateTime, Utc};
use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

/// A purchase as received from the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Raw client key; absent or blank disables idempotency.
    pub idempotency_key: Option<String>,
}

impl PurchaseRequest {
    /// Creates a request without an idempotency key.
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            idempotency_key: None,
        }
    }

    /// Attaches an idempotency key.
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Result of a successful purchase. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOutcome {
    product_id: ProductId,
    product_name: String,
    unit_price: Money,
    quantity: i64,
    total_price: Money,
    purchased_at: DateTime<Utc>,
    success: bool,
}

impl PurchaseOutcome {
    /// Builds the outcome of buying `quantity` units of `product`.
    ///
    /// Returns `None` if the total price does not fit in `Money`.
    pub fn new(
        product: &ProductSnapshot,
        quantity: i64,
        purchased_at: DateTime<Utc>,
    ) -> Option<Self> {
        Some(Self {
            product_id: product.id,
            product_name: product.name.clone(),
            unit_price: product.unit_price,
            quantity,
            total_price: product.unit_price.multiply(quantity)?,
            purchased_at,
            success: true,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn purchased_at(&self) -> DateTime<Utc> {
        self.purchased_at
    }

    pub fn success(&self) -> bool {
        self.success
    }
}

/// What a successful call to the orchestrator produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseReply {
    /// The purchase ran now.
    Completed {
        outcome: PurchaseOutcome,
        /// The serialized outcome, identical to what was stored for the key.
        payload: String,
    },

    /// A stored response for the idempotency key, returned verbatim.
    Replayed { payload: String },
}

impl PurchaseReply {
    /// The serialized response to hand to the client.
    pub fn payload(&self) -> &str {
        match self {
            PurchaseReply::Completed { payload, .. } | PurchaseReply::Replayed { payload } => {
                payload
            }
        }
    }

    /// Returns the outcome if the purchase ran in this call.
    pub fn outcome(&self) -> Option<&PurchaseOutcome> {
        match self {
            PurchaseReply::Completed { outcome, .. } => Some(outcome),
            PurchaseReply::Replayed { .. } => None,
        }
    }

    /// Returns true if this reply came from the idempotency store.
    pub fn is_replayed(&self) -> bool {
        matches!(self, PurchaseReply::Replayed { .. })
    }
}

use serde::{Deserialize, Serialize};

use crate::{Money, ProductId};

/// Name and price of a product as published by the catalog.
///
/// Transient: owned by the catalog and never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Money,
}

impl ProductSnapshot {
    /// Creates a snapshot.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
        }
    }
}

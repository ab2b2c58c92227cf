use thiserror::Error;

use crate::ProductId;

/// Errors that can occur when interacting with the stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An explicit stock level below zero was requested.
    #[error("Negative quantity {quantity} for product {product_id}")]
    NegativeQuantity { product_id: ProductId, quantity: i64 },

    /// A decrement amount that is zero or negative was requested.
    #[error("Invalid decrement of {quantity} for product {product_id}")]
    InvalidDecrement { product_id: ProductId, quantity: i64 },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

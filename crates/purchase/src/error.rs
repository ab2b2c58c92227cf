//! Purchase error types.

use catalog::FetchError;
use common::ProductId;
use store::StoreError;
use thiserror::Error;

/// Why a purchase did not complete.
///
/// Every variant is final for the request; none is retried here.
#[derive(Debug, Error)]
pub enum PurchaseError {
    /// The request is invalid and must be fixed by the caller.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The catalog has no such product.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The catalog could not be used, after retries or with the breaker open.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Not enough stock; nothing was decremented.
    #[error("Insufficient inventory for product {0}")]
    InsufficientInventory(ProductId),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Stable tag for each failure, for boundaries that map kinds to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    InvalidArgument,
    ProductNotFound,
    ServiceUnavailable,
    InsufficientInventory,
    Internal,
}

impl FailureKind {
    /// Returns the kind as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidArgument => "invalid_argument",
            FailureKind::ProductNotFound => "product_not_found",
            FailureKind::ServiceUnavailable => "service_unavailable",
            FailureKind::InsufficientInventory => "insufficient_inventory",
            FailureKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PurchaseError {
    /// Returns the failure kind.
    pub fn kind(&self) -> FailureKind {
        match self {
            PurchaseError::InvalidArgument(_) => FailureKind::InvalidArgument,
            PurchaseError::ProductNotFound(_) => FailureKind::ProductNotFound,
            PurchaseError::ServiceUnavailable(_) => FailureKind::ServiceUnavailable,
            PurchaseError::InsufficientInventory(_) => FailureKind::InsufficientInventory,
            PurchaseError::Storage(_) | PurchaseError::Serialization(_) => FailureKind::Internal,
        }
    }

    /// Returns true if the same request may succeed later unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PurchaseError::ServiceUnavailable(_))
    }
}

impl From<FetchError> for PurchaseError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(product_id) => PurchaseError::ProductNotFound(product_id),
            FetchError::CommunicationFailure(reason) => PurchaseError::ServiceUnavailable(reason),
        }
    }
}

/// Convenience type alias for purchase results.
pub type Result<T> = std::result::Result<T, PurchaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_errors_map_to_distinct_kinds() {
        let not_found = PurchaseError::from(FetchError::NotFound(ProductId::new(9)));
        assert_eq!(not_found.kind(), FailureKind::ProductNotFound);
        assert!(!not_found.is_retryable());

        let unavailable =
            PurchaseError::from(FetchError::CommunicationFailure("timeout".to_string()));
        assert_eq!(unavailable.kind(), FailureKind::ServiceUnavailable);
        assert!(unavailable.is_retryable());
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(
            PurchaseError::InsufficientInventory(ProductId::new(1))
                .kind()
                .to_string(),
            "insufficient_inventory"
        );
        assert_eq!(
            PurchaseError::InvalidArgument("x".to_string()).kind().as_str(),
            "invalid_argument"
        );
    }
}

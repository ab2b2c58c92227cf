//! Catalog error types.

use thiserror::Error;

use crate::ProductId;

/// Outcome of a single failed attempt against the catalog transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The catalog answered that the product does not exist.
    #[error("Product not found")]
    NotFound,

    /// The catalog answered with a non-success status other than 404.
    #[error("Unexpected status {0}")]
    Status(u16),

    /// The request never got an answer (refused, reset, DNS, ...).
    #[error("Connection error: {0}")]
    Connection(String),

    /// No answer arrived within the attempt timeout.
    #[error("Request timed out")]
    Timeout,

    /// A success response that lacks required fields or cannot be parsed.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Returns true if another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Status(_) | TransportError::Connection(_) | TransportError::Timeout
        )
    }
}

/// The only two ways a catalog lookup can fail, as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The product definitively does not exist upstream.
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// The catalog could not be reached or answered unusably.
    #[error("Catalog communication failure: {0}")]
    CommunicationFailure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(TransportError::Status(500).is_retryable());
        assert!(TransportError::Status(429).is_retryable());
        assert!(TransportError::Connection("refused".to_string()).is_retryable());
        assert!(TransportError::Timeout.is_retryable());
        assert!(!TransportError::NotFound.is_retryable());
        assert!(!TransportError::Malformed("missing data".to_string()).is_retryable());
    }
}

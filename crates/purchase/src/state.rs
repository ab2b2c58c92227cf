//! Purchase state machine.

/// Where a purchase is in its lifecycle.
///
/// State transitions:
/// ```text
/// Validating ──► CheckingIdempotency ──┬──► FetchingProduct ──► DecrementingStock ──► Completed
///      │                               └──► ReplayedFromCache
///      └──► Rejected            (any later step) ──► Failed
/// ```
/// `CheckingIdempotency` is skipped when no key is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PurchaseStage {
    /// Request fields are being checked; nothing has been touched yet.
    #[default]
    Validating,

    /// Looking for a stored response under the idempotency key.
    CheckingIdempotency,

    /// Waiting on the catalog.
    FetchingProduct,

    /// Running the conditional stock decrement.
    DecrementingStock,

    /// Outcome assembled and returned (terminal state).
    Completed,

    /// The request was invalid (terminal state).
    Rejected,

    /// A step after validation failed (terminal state).
    Failed,

    /// A stored response was returned instead of executing (terminal state).
    ReplayedFromCache,
}

impl PurchaseStage {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseStage::Completed
                | PurchaseStage::Rejected
                | PurchaseStage::Failed
                | PurchaseStage::ReplayedFromCache
        )
    }

    /// Terminal state reached when the step in this stage fails.
    pub fn on_failure(&self) -> PurchaseStage {
        match self {
            PurchaseStage::Validating => PurchaseStage::Rejected,
            _ => PurchaseStage::Failed,
        }
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStage::Validating => "Validating",
            PurchaseStage::CheckingIdempotency => "CheckingIdempotency",
            PurchaseStage::FetchingProduct => "FetchingProduct",
            PurchaseStage::DecrementingStock => "DecrementingStock",
            PurchaseStage::Completed => "Completed",
            PurchaseStage::Rejected => "Rejected",
            PurchaseStage::Failed => "Failed",
            PurchaseStage::ReplayedFromCache => "ReplayedFromCache",
        }
    }
}

impl std::fmt::Display for PurchaseStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

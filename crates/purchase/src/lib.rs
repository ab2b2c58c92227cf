//! Purchase orchestration.
//!
//! A purchase runs through these steps, each one final on failure:
//! 1. Validate the request
//! 2. Replay a stored response if the idempotency key was seen before
//! 3. Fetch name and price from the catalog (retries live in the catalog client)
//! 4. Atomically decrement stock if enough is available
//! 5. Assemble the outcome and store it under the idempotency key
//!
//! No in-memory state is shared between purchases; concurrent purchasers are
//! serialized only by the ledger's conditional decrement.

pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod state;
pub mod stock;

pub use error::{FailureKind, PurchaseError, Result};
pub use orchestrator::PurchaseOrchestrator;
pub use outcome::{PurchaseOutcome, PurchaseReply, PurchaseRequest};
pub use state::PurchaseStage;
pub use stock::StockService;

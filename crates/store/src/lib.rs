//! Storage collaborators for the purchase core.
//!
//! Two contracts live here:
//! - [`InventoryLedger`]: per-product stock with an atomic conditional decrement
//! - [`IdempotencyStore`]: create-once key to response cache
//!
//! Each has an in-memory implementation for tests and single-process use, and
//! a PostgreSQL implementation whose atomicity comes from single SQL statements.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::{IdempotencyKey, ProductId};
pub use error::{Result, StoreError};
pub use memory::{InMemoryIdempotencyStore, InMemoryInventoryLedger};
pub use postgres::{PostgresIdempotencyStore, PostgresInventoryLedger, run_migrations};
pub use record::{IdempotencyRecord, InventoryRecord};
pub use store::{IdempotencyStore, InventoryLedger};

//! Value types shared by every crate in the workspace.

pub mod types;

pub use types::{IdempotencyKey, Money, ProductId};

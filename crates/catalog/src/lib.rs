//! Client for the remote product catalog.
//!
//! A [`CatalogTransport`] performs one raw lookup. [`ResilientCatalogClient`]
//! wraps it with a [`RetryPolicy`] and a [`CircuitBreaker`] and classifies
//! every outcome into exactly one of: a [`ProductSnapshot`],
//! [`FetchError::NotFound`] or [`FetchError::CommunicationFailure`].

pub mod breaker;
pub mod client;
pub mod error;
pub mod http;
pub mod memory;
pub mod product;
pub mod retry;
pub mod transport;

pub use breaker::{BreakerConfig, BreakerOpen, BreakerState, CircuitBreaker, Permit};
pub use client::{ProductCatalog, ResilienceConfig, ResilientCatalogClient};
pub use common::{Money, ProductId};
pub use error::{FetchError, TransportError};
pub use http::HttpCatalogTransport;
pub use memory::InMemoryCatalogTransport;
pub use product::ProductSnapshot;
pub use retry::RetryPolicy;
pub use transport::CatalogTransport;

//! In-memory catalog transport with scriptable failures.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::{CatalogTransport, Money, ProductId, ProductSnapshot, TransportError};

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    products: HashMap<ProductId, ProductSnapshot>,
    scripted_failures: VecDeque<TransportError>,
    persistent_failure: Option<TransportError>,
    latency: Option<Duration>,
    attempts: usize,
}

/// In-memory catalog for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogTransport {
    state: Arc<Mutex<InMemoryCatalogState>>,
}

impl InMemoryCatalogTransport {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product and returns the catalog, for chained setup.
    pub fn with_product(self, id: i64, name: &str, unit_price_cents: i64) -> Self {
        self.insert(ProductSnapshot::new(
            id,
            name,
            Money::from_cents(unit_price_cents),
        ));
        self
    }

    /// Adds or replaces a product.
    pub fn insert(&self, product: ProductSnapshot) {
        self.state().products.insert(product.id, product);
    }

    /// Makes the next `times` attempts fail with `error`.
    pub fn fail_next(&self, times: usize, error: TransportError) {
        let mut state = self.state();
        for _ in 0..times {
            state.scripted_failures.push_back(error.clone());
        }
    }

    /// Makes every attempt fail with `error` until cleared with `None`.
    pub fn set_persistent_failure(&self, error: Option<TransportError>) {
        self.state().persistent_failure = error;
    }

    /// Delays every answer by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state().latency = latency;
    }

    /// Returns the number of attempts received.
    pub fn attempts(&self) -> usize {
        self.state().attempts
    }

    fn state(&self) -> MutexGuard<'_, InMemoryCatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CatalogTransport for InMemoryCatalogTransport {
    async fn get_product(&self, product_id: ProductId) -> Result<ProductSnapshot, TransportError> {
        let (result, latency) = {
            let mut state = self.state();
            state.attempts += 1;

            let result = if let Some(error) = state.scripted_failures.pop_front() {
                Err(error)
            } else if let Some(error) = state.persistent_failure.clone() {
                Err(error)
            } else {
                state
                    .products
                    .get(&product_id)
                    .cloned()
                    .ok_or(TransportError::NotFound)
            };
            (result, state.latency)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_and_not_found() {
        let catalog = InMemoryCatalogTransport::new().with_product(1, "Widget", 1000);

        let product = catalog.get_product(ProductId::new(1)).await.unwrap();
        assert_eq!(product.name, "Widget");
        assert_eq!(product.unit_price, Money::from_cents(1000));

        let missing = catalog.get_product(ProductId::new(2)).await;
        assert_eq!(missing, Err(TransportError::NotFound));
        assert_eq!(catalog.attempts(), 2);
    }

    #[tokio::test]
    async fn test_scripted_failures_run_out() {
        let catalog = InMemoryCatalogTransport::new().with_product(1, "Widget", 1000);
        catalog.fail_next(2, TransportError::Timeout);

        assert_eq!(
            catalog.get_product(ProductId::new(1)).await,
            Err(TransportError::Timeout)
        );
        assert_eq!(
            catalog.get_product(ProductId::new(1)).await,
            Err(TransportError::Timeout)
        );
        assert!(catalog.get_product(ProductId::new(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_persistent_failure_until_cleared() {
        let catalog = InMemoryCatalogTransport::new().with_product(1, "Widget", 1000);
        catalog.set_persistent_failure(Some(TransportError::Status(503)));

        for _ in 0..3 {
            assert_eq!(
                catalog.get_product(ProductId::new(1)).await,
                Err(TransportError::Status(503))
            );
        }

        catalog.set_persistent_failure(None);
        assert!(catalog.get_product(ProductId::new(1)).await.is_ok());
    }
}

//! Retry and circuit breaking around a catalog transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    BreakerConfig, CatalogTransport, CircuitBreaker, FetchError, ProductId, ProductSnapshot,
    RetryPolicy, TransportError,
};

/// Product lookup as seen by the purchase core.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Loads a product, classifying every failure as not-found or communication failure.
    async fn fetch(&self, product_id: ProductId) -> Result<ProductSnapshot, FetchError>;
}

#[async_trait]
impl<T: ProductCatalog + ?Sized> ProductCatalog for Arc<T> {
    async fn fetch(&self, product_id: ProductId) -> Result<ProductSnapshot, FetchError> {
        (**self).fetch(product_id).await
    }
}

/// Resilience settings for [`ResilientCatalogClient`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResilienceConfig {
    pub retry: RetryPolicy,
    pub breaker: BreakerConfig,
    /// Upper bound for a single attempt; `None` leaves it to the transport.
    pub attempt_timeout: Option<Duration>,
}

/// Catalog client with bounded retry and a circuit breaker.
///
/// Every attempt goes through the breaker. A rejected attempt fails fast
/// without a network call and ends the retry loop.
pub struct ResilientCatalogClient<T: CatalogTransport> {
    transport: T,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    attempt_timeout: Option<Duration>,
}

impl<T: CatalogTransport> ResilientCatalogClient<T> {
    /// Wraps a transport.
    pub fn new(transport: T, config: ResilienceConfig) -> Self {
        Self {
            transport,
            retry: config.retry,
            breaker: CircuitBreaker::new(config.breaker),
            attempt_timeout: config.attempt_timeout,
        }
    }

    /// Returns the breaker, for inspection.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Returns the wrapped transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn attempt(&self, product_id: ProductId) -> Result<ProductSnapshot, TransportError> {
        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, self.transport.get_product(product_id))
                .await
                .unwrap_or(Err(TransportError::Timeout)),
            None => self.transport.get_product(product_id).await,
        }
    }
}

#[async_trait]
impl<T: CatalogTransport> ProductCatalog for ResilientCatalogClient<T> {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, product_id: ProductId) -> Result<ProductSnapshot, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            let permit = self.breaker.try_acquire().map_err(|rejected| {
                tracing::warn!(attempt, "catalog call rejected by circuit breaker");
                FetchError::CommunicationFailure(rejected.to_string())
            })?;

            metrics::counter!("catalog_attempts_total").increment(1);
            match self.attempt(product_id).await {
                Ok(product) => {
                    permit.success();
                    return Ok(product);
                }
                Err(TransportError::NotFound) => {
                    // The catalog answered; a definitive miss is not a fault.
                    permit.success();
                    return Err(FetchError::NotFound(product_id));
                }
                Err(error) => {
                    permit.failure();

                    if !error.is_retryable() || !self.retry.allows_retry(attempt) {
                        tracing::warn!(attempt, %error, "catalog lookup failed");
                        return Err(FetchError::CommunicationFailure(error.to_string()));
                    }

                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(attempt, %error, ?delay, "catalog attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

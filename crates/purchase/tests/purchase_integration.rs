//! Integration tests for purchase orchestration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use catalog::{
    BreakerState, InMemoryCatalogTransport, ResilienceConfig, ResilientCatalogClient,
    RetryPolicy, TransportError,
};
use common::{IdempotencyKey, Money, ProductId};
use purchase::{
    FailureKind, PurchaseError, PurchaseOrchestrator, PurchaseOutcome, PurchaseRequest,
    StockService,
};
use store::{
    IdempotencyRecord, IdempotencyStore, InMemoryIdempotencyStore, InMemoryInventoryLedger,
    InventoryLedger, StoreError,
};

type TestOrchestrator = PurchaseOrchestrator<
    InMemoryInventoryLedger,
    InMemoryIdempotencyStore,
    ResilientCatalogClient<InMemoryCatalogTransport>,
>;

const WIDGET: i64 = 1;
const WIDGET_PRICE_CENTS: i64 = 1999;

struct TestHarness {
    orchestrator: TestOrchestrator,
    ledger: InMemoryInventoryLedger,
    idempotency: InMemoryIdempotencyStore,
    transport: InMemoryCatalogTransport,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_retry(RetryPolicy::default())
    }

    fn with_retry(retry: RetryPolicy) -> Self {
        let ledger = InMemoryInventoryLedger::new();
        let idempotency = InMemoryIdempotencyStore::new();
        let transport =
            InMemoryCatalogTransport::new().with_product(WIDGET, "Widget", WIDGET_PRICE_CENTS);

        let catalog = ResilientCatalogClient::new(
            transport.clone(),
            ResilienceConfig {
                retry,
                ..ResilienceConfig::default()
            },
        );
        let orchestrator = PurchaseOrchestrator::new(ledger.clone(), idempotency.clone(), catalog);

        Self {
            orchestrator,
            ledger,
            idempotency,
            transport,
        }
    }

    async fn stock(&self, quantity: i64) {
        self.ledger.set(ProductId::new(WIDGET), quantity).await.unwrap();
    }

    async fn quantity(&self) -> Option<i64> {
        self.ledger.quantity(ProductId::new(WIDGET)).await
    }
}

#[tokio::test]
async fn test_non_positive_quantity_is_invalid() {
    let h = TestHarness::new();
    h.stock(10).await;

    for quantity in [0, -1] {
        let result = h
            .orchestrator
            .purchase(PurchaseRequest::new(WIDGET, quantity).with_idempotency_key("A"))
            .await;
        let err = result.unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidArgument);
    }

    assert_eq!(h.transport.attempts(), 0);
    assert_eq!(h.ledger.decrement_calls(), 0);
    assert_eq!(h.idempotency.record_calls(), 0);
    assert_eq!(h.quantity().await, Some(10));
}

#[tokio::test]
async fn test_purchase_then_replay_is_identical() {
    let h = TestHarness::new();
    h.stock(10).await;
    let request = PurchaseRequest::new(WIDGET, 3).with_idempotency_key("A");

    let first = h.orchestrator.purchase(request.clone()).await.unwrap();
    let outcome = first.outcome().unwrap();
    assert_eq!(outcome.product_name(), "Widget");
    assert_eq!(outcome.unit_price(), Money::from_cents(WIDGET_PRICE_CENTS));
    assert_eq!(outcome.total_price(), Money::from_cents(3 * WIDGET_PRICE_CENTS));
    assert!(outcome.success());
    assert_eq!(h.quantity().await, Some(7));

    let decrements = h.ledger.decrement_calls();
    let attempts = h.transport.attempts();

    let replay = h.orchestrator.purchase(request).await.unwrap();
    assert!(replay.is_replayed());
    assert_eq!(replay.payload(), first.payload());
    assert_eq!(h.quantity().await, Some(7));
    assert_eq!(h.ledger.decrement_calls(), decrements);
    assert_eq!(h.transport.attempts(), attempts);

    // The payload round-trips to the same outcome.
    let decoded: PurchaseOutcome = serde_json::from_str(replay.payload()).unwrap();
    assert_eq!(&decoded, outcome);

    let key = IdempotencyKey::parse(Some("A")).unwrap();
    let record = h.idempotency.get_record(&key).await.unwrap().unwrap();
    assert_eq!(record.response, first.payload());
}

#[tokio::test]
async fn test_insufficient_stock_keeps_quantity() {
    let h = TestHarness::new();
    h.stock(2).await;

    let result = h
        .orchestrator
        .purchase(PurchaseRequest::new(WIDGET, 5).with_idempotency_key("B"))
        .await;
    assert!(matches!(result, Err(PurchaseError::InsufficientInventory(_))));
    assert_eq!(h.quantity().await, Some(2));
    assert!(h.idempotency.is_empty().await);

    // A later attempt under the same key runs again rather than replaying the refusal.
    h.stock(5).await;
    let reply = h
        .orchestrator
        .purchase(PurchaseRequest::new(WIDGET, 5).with_idempotency_key("B"))
        .await
        .unwrap();
    assert!(!reply.is_replayed());
    assert_eq!(h.quantity().await, Some(0));
}

#[tokio::test]
async fn test_overflowing_total_is_refused_before_decrement() {
    let h = TestHarness::new();
    let quantity = 10_000_000_000_000_000;
    h.stock(quantity).await;

    let result = h
        .orchestrator
        .purchase(PurchaseRequest::new(WIDGET, quantity).with_idempotency_key("E"))
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidArgument);
    assert_eq!(h.ledger.decrement_calls(), 0);
    assert_eq!(h.quantity().await, Some(quantity));
    assert!(h.idempotency.is_empty().await);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let h = TestHarness::new();
    h.ledger.set(ProductId::new(999), 10).await.unwrap();

    let result = h.orchestrator.purchase(PurchaseRequest::new(999, 1)).await;
    assert!(matches!(
        result,
        Err(PurchaseError::ProductNotFound(id)) if id == ProductId::new(999)
    ));
    assert_eq!(h.transport.attempts(), 1);
    assert_eq!(h.ledger.decrement_calls(), 0);
    assert_eq!(h.ledger.quantity(ProductId::new(999)).await, Some(10));
}

#[tokio::test(start_paused = true)]
async fn test_network_outage_is_service_unavailable() {
    let h = TestHarness::new();
    h.stock(10).await;
    h.transport
        .fail_next(3, TransportError::Connection("connection reset".to_string()));

    let started = tokio::time::Instant::now();
    let result = h
        .orchestrator
        .purchase(PurchaseRequest::new(WIDGET, 1).with_idempotency_key("C"))
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), FailureKind::ServiceUnavailable);
    assert!(err.is_retryable());
    assert_eq!(h.transport.attempts(), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(2));
    assert_eq!(h.ledger.decrement_calls(), 0);
    assert_eq!(h.quantity().await, Some(10));
    assert!(h.idempotency.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_open_breaker_fails_fast() {
    let h = TestHarness::with_retry(RetryPolicy::fixed(1, Duration::ZERO));
    h.stock(10).await;
    h.transport
        .set_persistent_failure(Some(TransportError::Status(503)));

    for _ in 0..5 {
        let result = h.orchestrator.purchase(PurchaseRequest::new(WIDGET, 1)).await;
        assert!(matches!(result, Err(PurchaseError::ServiceUnavailable(_))));
    }
    assert_eq!(
        h.orchestrator.catalog().breaker().state(),
        BreakerState::Open
    );

    let result = h.orchestrator.purchase(PurchaseRequest::new(WIDGET, 1)).await;
    assert!(matches!(result, Err(PurchaseError::ServiceUnavailable(_))));
    assert_eq!(h.transport.attempts(), 5);
    assert_eq!(h.ledger.decrement_calls(), 0);
}

#[tokio::test]
async fn test_blank_key_skips_idempotency() {
    let h = TestHarness::new();
    h.stock(10).await;

    for _ in 0..2 {
        let reply = h
            .orchestrator
            .purchase(PurchaseRequest::new(WIDGET, 1).with_idempotency_key("  "))
            .await
            .unwrap();
        assert!(!reply.is_replayed());
    }

    assert_eq!(h.quantity().await, Some(8));
    assert_eq!(h.idempotency.record_calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_purchases_never_oversell() {
    let h = Arc::new(TestHarness::new());
    h.stock(10).await;

    let mut handles = Vec::new();
    for _ in 0..25 {
        let h = Arc::clone(&h);
        handles.push(tokio::spawn(async move {
            h.orchestrator
                .purchase(PurchaseRequest::new(WIDGET, 1))
                .await
        }));
    }

    let mut succeeded = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(PurchaseError::InsufficientInventory(_)) => refused += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(refused, 15);
    assert_eq!(h.quantity().await, Some(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_purchases_with_distinct_keys() {
    let h = Arc::new(TestHarness::new());
    h.stock(6).await;

    let mut handles = Vec::new();
    for i in 0..6 {
        let h = Arc::clone(&h);
        handles.push(tokio::spawn(async move {
            h.orchestrator
                .purchase(PurchaseRequest::new(WIDGET, 1).with_idempotency_key(format!("key-{i}")))
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(h.quantity().await, Some(0));
    assert_eq!(h.idempotency.len().await, 6);
}

/// Idempotency store whose writes always fail.
#[derive(Clone, Default)]
struct FailingRecordStore {
    inner: InMemoryIdempotencyStore,
}

#[async_trait]
impl IdempotencyStore for FailingRecordStore {
    async fn lookup(&self, key: &IdempotencyKey) -> store::Result<Option<String>> {
        self.inner.lookup(key).await
    }

    async fn record(&self, _key: &IdempotencyKey, _response: &str) -> store::Result<bool> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn get_record(&self, key: &IdempotencyKey) -> store::Result<Option<IdempotencyRecord>> {
        self.inner.get_record(key).await
    }
}

#[tokio::test]
async fn test_record_failure_still_returns_outcome() {
    let ledger = InMemoryInventoryLedger::new();
    ledger.set(ProductId::new(WIDGET), 4).await.unwrap();
    let catalog = ResilientCatalogClient::new(
        InMemoryCatalogTransport::new().with_product(WIDGET, "Widget", WIDGET_PRICE_CENTS),
        ResilienceConfig::default(),
    );
    let orchestrator =
        PurchaseOrchestrator::new(ledger.clone(), FailingRecordStore::default(), catalog);

    let reply = orchestrator
        .purchase(PurchaseRequest::new(WIDGET, 1).with_idempotency_key("D"))
        .await
        .unwrap();

    assert_eq!(reply.outcome().unwrap().quantity(), 1);
    assert_eq!(ledger.quantity(ProductId::new(WIDGET)).await, Some(3));
}

#[tokio::test]
async fn test_stock_service_shares_the_ledger() {
    let h = TestHarness::new();
    let stock = StockService::new(h.ledger.clone());

    stock.set(ProductId::new(WIDGET), 3).await.unwrap();
    h.orchestrator
        .purchase(PurchaseRequest::new(WIDGET, 2))
        .await
        .unwrap();

    let record = stock.get(ProductId::new(WIDGET)).await.unwrap();
    assert_eq!(record.quantity, 1);
    assert!(matches!(
        stock.set(ProductId::new(WIDGET), -3).await,
        Err(PurchaseError::InvalidArgument(_))
    ));
}

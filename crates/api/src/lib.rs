//! HTTP API server for stock administration and idempotent purchases.
//!
//! Storage and the catalog are injected as trait objects, so the same router
//! runs against PostgreSQL and the remote catalog in production and against
//! in-memory collaborators in tests.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use catalog::ProductCatalog;
use metrics_exporter_prometheus::PrometheusHandle;
use purchase::{PurchaseOrchestrator, StockService};
use store::{IdempotencyStore, InMemoryIdempotencyStore, InMemoryInventoryLedger, InventoryLedger};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub type SharedLedger = Arc<dyn InventoryLedger>;
pub type SharedIdempotencyStore = Arc<dyn IdempotencyStore>;
pub type SharedCatalog = Arc<dyn ProductCatalog>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orchestrator: PurchaseOrchestrator<SharedLedger, SharedIdempotencyStore, SharedCatalog>,
    pub stock: StockService<SharedLedger>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/inventory/{product_id}",
            get(routes::inventory::get).put(routes::inventory::set),
        )
        .route("/purchases", post(routes::purchases::create))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state from its collaborators.
///
/// The stock service and the orchestrator share the same ledger.
pub fn create_state(
    ledger: SharedLedger,
    idempotency: SharedIdempotencyStore,
    catalog: SharedCatalog,
) -> Arc<AppState> {
    Arc::new(AppState {
        orchestrator: PurchaseOrchestrator::new(ledger.clone(), idempotency, catalog),
        stock: StockService::new(ledger),
    })
}

/// Creates the application state with in-memory stores.
pub fn create_default_state(catalog: SharedCatalog) -> Arc<AppState> {
    create_state(
        Arc::new(InMemoryInventoryLedger::new()),
        Arc::new(InMemoryIdempotencyStore::new()),
        catalog,
    )
}

//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use api::{SharedCatalog, SharedIdempotencyStore, SharedLedger};
use catalog::{HttpCatalogTransport, ResilientCatalogClient};
use sqlx::postgres::PgPoolOptions;
use store::{
    InMemoryIdempotencyStore, InMemoryInventoryLedger, PostgresIdempotencyStore,
    PostgresInventoryLedger,
};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Opens the stores: PostgreSQL when a database URL is configured, memory otherwise.
async fn open_stores(config: &Config) -> (SharedLedger, SharedIdempotencyStore) {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to database");
            store::run_migrations(&pool)
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL stores");

            let ledger: SharedLedger = Arc::new(PostgresInventoryLedger::new(pool.clone()));
            let idempotency: SharedIdempotencyStore = Arc::new(PostgresIdempotencyStore::new(pool));
            (ledger, idempotency)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, stock and idempotency keys live in memory");
            let ledger: SharedLedger = Arc::new(InMemoryInventoryLedger::new());
            let idempotency: SharedIdempotencyStore = Arc::new(InMemoryIdempotencyStore::new());
            (ledger, idempotency)
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Open the stores
    let (ledger, idempotency) = open_stores(&config).await;

    // 4. Build the catalog client
    let transport = HttpCatalogTransport::new(
        config.catalog_url.clone(),
        config.catalog_api_key.clone(),
        config.catalog_timeout,
    )
    .expect("failed to build catalog HTTP client");
    let catalog: SharedCatalog =
        Arc::new(ResilientCatalogClient::new(transport, config.resilience()));
    tracing::info!(catalog_url = %config.catalog_url, "catalog client ready");

    // 5. Build the application
    let app = api::create_app(
        api::create_state(ledger, idempotency, catalog),
        metrics_handle,
    );

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

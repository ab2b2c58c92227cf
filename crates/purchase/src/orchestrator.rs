//! Purchase orchestrator.

use catalog::ProductCatalog;
use chrono::Utc;
use common::IdempotencyKey;
use store::{IdempotencyStore, InventoryLedger};

use crate::error::{PurchaseError, Result};
use crate::outcome::{PurchaseOutcome, PurchaseReply, PurchaseRequest};
use crate::state::PurchaseStage;

/// Runs purchases against a stock ledger, an idempotency store and a catalog.
///
/// The orchestrator holds no per-purchase state; it is safe to share one
/// instance across any number of concurrent requests.
pub struct PurchaseOrchestrator<L, I, C>
where
    L: InventoryLedger,
    I: IdempotencyStore,
    C: ProductCatalog,
{
    ledger: L,
    idempotency: I,
    catalog: C,
}

impl<L, I, C> PurchaseOrchestrator<L, I, C>
where
    L: InventoryLedger,
    I: IdempotencyStore,
    C: ProductCatalog,
{
    /// Creates a new orchestrator.
    pub fn new(ledger: L, idempotency: I, catalog: C) -> Self {
        Self {
            ledger,
            idempotency,
            catalog,
        }
    }

    /// Returns the stock ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Returns the idempotency store.
    pub fn idempotency(&self) -> &I {
        &self.idempotency
    }

    /// Returns the catalog.
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Executes a purchase.
    ///
    /// A repeated idempotency key returns the stored payload byte for byte
    /// without touching the catalog or the ledger. On any error no stock has
    /// been decremented.
    #[tracing::instrument(
        skip(self, request),
        fields(product_id = %request.product_id, quantity = request.quantity)
    )]
    pub async fn purchase(&self, request: PurchaseRequest) -> Result<PurchaseReply> {
        let started = std::time::Instant::now();
        let mut stage = PurchaseStage::default();

        let result = self.run(&request, &mut stage).await;

        let label = match &result {
            Ok(reply) if reply.is_replayed() => "replayed",
            Ok(_) => "completed",
            Err(e) => e.kind().as_str(),
        };
        metrics::counter!("purchases_total", "outcome" => label).increment(1);
        metrics::histogram!("purchase_duration_seconds").record(started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            let terminal = stage.on_failure();
            if e.kind() == crate::FailureKind::Internal {
                tracing::error!(stage = %stage, terminal = %terminal, error = %e, "purchase failed");
            } else {
                tracing::warn!(stage = %stage, terminal = %terminal, error = %e, "purchase refused");
            }
        }

        result
    }

    async fn run(&self, request: &PurchaseRequest, stage: &mut PurchaseStage) -> Result<PurchaseReply> {
        let key = validate(request)?;

        if let Some(key) = &key {
            advance(stage, PurchaseStage::CheckingIdempotency);
            if let Some(payload) = self.idempotency.lookup(key).await? {
                advance(stage, PurchaseStage::ReplayedFromCache);
                return Ok(PurchaseReply::Replayed { payload });
            }
        }

        advance(stage, PurchaseStage::FetchingProduct);
        let product = self.catalog.fetch(request.product_id).await?;

        // Everything that can still fail runs before stock is touched.
        let outcome = PurchaseOutcome::new(&product, request.quantity, Utc::now()).ok_or_else(
            || {
                PurchaseError::InvalidArgument(format!(
                    "total price of {} x {} overflows",
                    request.quantity, product.unit_price
                ))
            },
        )?;
        let payload = serde_json::to_string(&outcome)?;

        advance(stage, PurchaseStage::DecrementingStock);
        if !self
            .ledger
            .decrement_if_enough(request.product_id, request.quantity)
            .await?
        {
            return Err(PurchaseError::InsufficientInventory(request.product_id));
        }

        if let Some(key) = &key {
            self.remember(key, &payload).await;
        }

        advance(stage, PurchaseStage::Completed);
        tracing::info!(
            product_name = outcome.product_name(),
            total = %outcome.total_price(),
            "purchase completed"
        );
        Ok(PurchaseReply::Completed { outcome, payload })
    }

    /// Stores the payload under the key. Stock is already gone at this point,
    /// so a storage failure is logged and the purchase still succeeds.
    async fn remember(&self, key: &IdempotencyKey, payload: &str) {
        match self.idempotency.record(key, payload).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(key = %key, "idempotency key already stored by a concurrent request");
            }
            Err(e) => {
                metrics::counter!("idempotency_record_failures_total").increment(1);
                tracing::error!(key = %key, error = %e, "failed to store idempotent response");
            }
        }
    }
}

fn validate(request: &PurchaseRequest) -> Result<Option<IdempotencyKey>> {
    if request.quantity <= 0 {
        return Err(PurchaseError::InvalidArgument(
            "quantity must be > 0".to_string(),
        ));
    }

    let key = IdempotencyKey::parse(request.idempotency_key.as_deref());
    if let Some(key) = &key
        && !key.is_within_limit()
    {
        return Err(PurchaseError::InvalidArgument(format!(
            "idempotency key must be at most {} characters",
            IdempotencyKey::MAX_LEN
        )));
    }

    Ok(key)
}

fn advance(stage: &mut PurchaseStage, next: PurchaseStage) {
    tracing::info!(from = %stage, to = %next, "purchase stage advanced");
    *stage = next;
}

//! Stock administration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ProductId;
use serde::{Deserialize, Serialize};
use store::InventoryRecord;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct SetStockRequest {
    pub quantity: i64,
}

#[derive(Serialize)]
pub struct InventoryResponse {
    pub product_id: i64,
    pub quantity: i64,
    pub version: i64,
}

impl From<InventoryRecord> for InventoryResponse {
    fn from(record: InventoryRecord) -> Self {
        Self {
            product_id: record.product_id.as_i64(),
            quantity: record.quantity,
            version: record.version,
        }
    }
}

/// GET /inventory/{product_id}: current stock, creating an empty record if needed.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
) -> Result<Json<InventoryResponse>, ApiError> {
    let record = state.stock.get(ProductId::new(product_id)).await?;
    Ok(Json(record.into()))
}

/// PUT /inventory/{product_id}: overwrite the stock level.
pub async fn set(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
    Json(body): Json<SetStockRequest>,
) -> Result<Json<InventoryResponse>, ApiError> {
    let record = state
        .stock
        .set(ProductId::new(product_id), body.quantity)
        .await?;
    Ok(Json(record.into()))
}

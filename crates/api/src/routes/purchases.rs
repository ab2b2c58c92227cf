//! Purchase endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use purchase::PurchaseRequest;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;

/// Request header carrying the client's idempotency key.
pub const IDEMPOTENCY_KEY: HeaderName = HeaderName::from_static("idempotency-key");

/// Response header set when the body was replayed from a previous request.
pub const IDEMPOTENT_REPLAYED: HeaderName = HeaderName::from_static("idempotent-replayed");

#[derive(Deserialize)]
pub struct PurchaseBody {
    pub product_id: i64,
    pub quantity: i64,
}

/// POST /purchases: buy `quantity` units of a product.
///
/// The body of a successful response is the stored purchase payload, so a
/// replayed request gets exactly the bytes of the first response.
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<PurchaseBody>,
) -> Result<Response, ApiError> {
    let mut request = PurchaseRequest::new(body.product_id, body.quantity);
    if let Some(value) = headers.get(&IDEMPOTENCY_KEY) {
        let key = value
            .to_str()
            .map_err(|_| ApiError::BadRequest("Idempotency-Key must be visible ASCII".to_string()))?;
        request = request.with_idempotency_key(key);
    }

    let reply = state.orchestrator.purchase(request).await?;

    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        reply.payload().to_string(),
    )
        .into_response();
    if reply.is_replayed() {
        response
            .headers_mut()
            .insert(IDEMPOTENT_REPLAYED, HeaderValue::from_static("true"));
    }
    Ok(response)
}

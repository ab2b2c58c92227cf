//! HTTP transport for the catalog's JSON:API endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use crate::{CatalogTransport, Money, ProductId, ProductSnapshot, TransportError};

const JSON_API: &str = "application/vnd.api+json";
const API_KEY_HEADER: &str = "X-API-KEY";

/// Catalog transport over HTTP.
///
/// Issues `GET {base_url}/api/v1/products/{id}` and expects a JSON:API
/// document with `data.id`, `data.attributes.name` and `data.attributes.price`.
#[derive(Debug, Clone)]
pub struct HttpCatalogTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpCatalogTransport {
    /// Creates a transport with a per-request timeout.
    ///
    /// An empty `api_key` means no key header is sent.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
        })
    }

    fn product_url(&self, product_id: ProductId) -> String {
        format!("{}/api/v1/products/{}", self.base_url, product_id)
    }
}

#[async_trait]
impl CatalogTransport for HttpCatalogTransport {
    #[tracing::instrument(skip(self))]
    async fn get_product(&self, product_id: ProductId) -> Result<ProductSnapshot, TransportError> {
        let mut request = self
            .client
            .get(self.product_url(product_id))
            .header(ACCEPT, JSON_API);
        if let Some(ref key) = self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(classify_send_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound);
        }
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify_send_error)?;
        parse_product(product_id, &body)
    }
}

fn classify_send_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Connection(error.to_string())
    }
}

#[derive(Deserialize)]
struct Document {
    data: Option<Resource>,
}

#[derive(Deserialize)]
struct Resource {
    id: Option<serde_json::Value>,
    attributes: Option<Attributes>,
}

#[derive(Deserialize)]
struct Attributes {
    name: Option<String>,
    price: Option<f64>,
}

/// Parses a JSON:API product document.
///
/// Anything short of a complete, consistent product is `Malformed`.
pub(crate) fn parse_product(
    requested: ProductId,
    body: &[u8],
) -> Result<ProductSnapshot, TransportError> {
    let document: Document = serde_json::from_slice(body)
        .map_err(|e| TransportError::Malformed(format!("invalid JSON: {e}")))?;

    let data = document
        .data
        .ok_or_else(|| TransportError::Malformed("missing data field".to_string()))?;

    let id = match data.id {
        Some(serde_json::Value::String(raw)) => raw.parse::<i64>().ok(),
        Some(serde_json::Value::Number(number)) => number.as_i64(),
        _ => None,
    }
    .map(ProductId::new)
    .ok_or_else(|| TransportError::Malformed("missing or invalid id".to_string()))?;

    if id != requested {
        return Err(TransportError::Malformed(format!(
            "requested product {requested}, received {id}"
        )));
    }

    let attributes = data
        .attributes
        .ok_or_else(|| TransportError::Malformed("missing attributes".to_string()))?;
    let (Some(name), Some(price)) = (attributes.name, attributes.price) else {
        return Err(TransportError::Malformed(
            "missing required attributes".to_string(),
        ));
    };

    let unit_price = Money::from_decimal(price)
        .filter(|money| !money.is_negative())
        .ok_or_else(|| TransportError::Malformed(format!("invalid price {price}")))?;

    Ok(ProductSnapshot {
        id,
        name,
        unit_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete_document() {
        let body = br#"{"data":{"type":"products","id":"7","attributes":{"name":"Lamp","price":19.99,"description":null}}}"#;
        let product = parse_product(ProductId::new(7), body).unwrap();
        assert_eq!(product.id, ProductId::new(7));
        assert_eq!(product.name, "Lamp");
        assert_eq!(product.unit_price, Money::from_cents(1999));
    }

    #[test]
    fn test_parse_numeric_id() {
        let body = br#"{"data":{"id":7,"attributes":{"name":"Lamp","price":1}}}"#;
        let product = parse_product(ProductId::new(7), body).unwrap();
        assert_eq!(product.unit_price, Money::from_cents(100));
    }

    #[test]
    fn test_parse_rejects_incomplete_documents() {
        let cases: [&[u8]; 7] = [
            b"not json",
            br#"{}"#,
            br#"{"data":{"attributes":{"name":"Lamp","price":1}}}"#,
            br#"{"data":{"id":"x","attributes":{"name":"Lamp","price":1}}}"#,
            br#"{"data":{"id":"7"}}"#,
            br#"{"data":{"id":"7","attributes":{"price":1}}}"#,
            br#"{"data":{"id":"7","attributes":{"name":"Lamp"}}}"#,
        ];
        for body in cases {
            let result = parse_product(ProductId::new(7), body);
            assert!(
                matches!(result, Err(TransportError::Malformed(_))),
                "expected malformed for {}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn test_parse_rejects_negative_price_and_id_mismatch() {
        let negative = br#"{"data":{"id":"7","attributes":{"name":"Lamp","price":-1}}}"#;
        assert!(matches!(
            parse_product(ProductId::new(7), negative),
            Err(TransportError::Malformed(_))
        ));

        let other = br#"{"data":{"id":"8","attributes":{"name":"Lamp","price":1}}}"#;
        assert!(matches!(
            parse_product(ProductId::new(7), other),
            Err(TransportError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_api_key_is_dropped() {
        let transport =
            HttpCatalogTransport::new("http://catalog/", Some(String::new()), Duration::from_secs(1))
                .unwrap();
        assert!(transport.api_key.is_none());
        assert_eq!(
            transport.product_url(ProductId::new(3)),
            "http://catalog/api/v1/products/3"
        );
    }
}

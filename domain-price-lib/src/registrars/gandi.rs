//! Gandi availability backend.
//!
//! `GET <base>/v5/domain/check?name=<domain>&processes=create,transfer&grid=C`
//! answers with a product catalog. Only the first product is considered; its
//! `status` gates everything else, and the yearly price is the entry whose
//! duration unit is a year and whose minimum duration is 1. Prices are
//! tax-inclusive and quoted in EUR unless the response names another currency.

use super::{http_client, send_with_retry, unavailable_from, RegistrarClient};
use crate::currency::CurrencyConverter;
use crate::error::LookupError;
use crate::types::{BackendConfig, DomainName, Price, PriceConfig, Quote, RegistrarId};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const REGISTRAR_NAME: &str = "Gandi.net";

const PROCESSES: &str = "create,transfer";
const PRICE_GRID: &str = "C";
const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    products: Option<Vec<Product>>,
}

#[derive(Debug, Deserialize)]
struct Product {
    status: String,
    #[serde(default)]
    prices: Vec<PriceEntry>,
}

#[derive(Debug, Deserialize)]
struct PriceEntry {
    #[serde(default)]
    duration_unit: Option<String>,
    #[serde(default)]
    min_duration: Option<u32>,
    #[serde(default)]
    price_after_taxes: Option<f64>,
}

impl PriceEntry {
    fn is_single_year(&self) -> bool {
        let yearly = matches!(self.duration_unit.as_deref(), Some("y") | Some("year"));
        yearly && self.min_duration == Some(1)
    }
}

/// Client for the Gandi v5 domain API.
pub struct GandiClient {
    id: RegistrarId,
    http_client: reqwest::Client,
    backend: BackendConfig,
    retry_backoff: Duration,
    target_currency: String,
    converter: Arc<CurrencyConverter>,
}

impl GandiClient {
    pub fn new(config: &PriceConfig, converter: Arc<CurrencyConverter>) -> Result<Self, LookupError> {
        Ok(Self {
            id: RegistrarId::new(REGISTRAR_NAME),
            http_client: http_client(config)?,
            backend: config.gandi.clone(),
            retry_backoff: config.retry_backoff,
            target_currency: config.target_currency.clone(),
            converter,
        })
    }

    async fn to_quote(&self, domain: &DomainName, response: CheckResponse) -> Result<Quote, LookupError> {
        let product = response
            .products
            .as_ref()
            .and_then(|products| products.first())
            .ok_or_else(|| LookupError::malformed("response has no product information"))?;

        if product.status != "available" {
            debug!(registrar = %self.id, domain = %domain, status = %product.status, "Not available");
            return Ok(Quote::unavailable(self.id.clone(), domain.clone()));
        }

        let original_amount = product
            .prices
            .iter()
            .filter(|entry| entry.is_single_year())
            .find_map(|entry| entry.price_after_taxes)
            .ok_or_else(|| LookupError::no_pricing("no one-year price entry"))?;

        let original_currency = response
            .currency
            .as_deref()
            .map(str::to_uppercase)
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let conversion = self
            .converter
            .convert(original_amount, &original_currency, &self.target_currency)
            .await;

        Ok(Quote::available(
            self.id.clone(),
            domain.clone(),
            Price {
                amount: conversion.amount,
                currency: self.target_currency.clone(),
                original_amount,
                original_currency,
                used_fallback_rate: conversion.used_fallback,
            },
        ))
    }
}

#[async_trait]
impl RegistrarClient for GandiClient {
    fn id(&self) -> &RegistrarId {
        &self.id
    }

    async fn check_availability(&self, domain: &DomainName) -> Result<Quote, LookupError> {
        let auth = match self.backend.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => format!("Apikey {}", key),
            None => return Err(LookupError::malformed("missing API credentials")),
        };

        let url = format!("{}/v5/domain/check", self.backend.base());
        debug!(registrar = %self.id, domain = %domain, "Checking availability");

        let response = send_with_retry(&self.id, self.retry_backoff, || {
            self.http_client
                .get(&url)
                .query(&[
                    ("name", domain.as_str()),
                    ("processes", PROCESSES),
                    ("grid", PRICE_GRID),
                ])
                .header("Authorization", auth.as_str())
                .header("Accept", "application/json")
        })
        .await?;

        if response.status() != StatusCode::OK {
            return Err(unavailable_from(response).await);
        }

        let body: CheckResponse = response.json().await?;
        self.to_quote(domain, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(base_url: &str, with_key: bool) -> GandiClient {
        let mut backend = BackendConfig::new(base_url);
        if with_key {
            backend = backend.with_key("gandi-key");
        }
        let config = PriceConfig::default()
            .with_gandi(backend)
            .with_retry_backoff(Duration::from_millis(10));
        let converter = Arc::new(CurrencyConverter::new(&config).unwrap());
        GandiClient::new(&config, converter).unwrap()
    }

    fn domain() -> DomainName {
        DomainName::parse("example.net").unwrap()
    }

    async fn respond_with(server: &MockServer, body: serde_json::Value) {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v5/domain/check");
                then.status(200).json_body(body);
            })
            .await;
    }

    #[tokio::test]
    async fn test_yearly_price_is_extracted() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v5/domain/check")
                    .query_param("name", "example.net")
                    .query_param("processes", "create,transfer")
                    .query_param("grid", "C")
                    .header("Authorization", "Apikey gandi-key");
                then.status(200).json_body(json!({
                    "currency": "EUR",
                    "products": [{
                        "status": "available",
                        "process": "create",
                        "prices": [
                            {"duration_unit": "m", "min_duration": 1, "price_after_taxes": 2.5},
                            {"duration_unit": "y", "min_duration": 2, "price_after_taxes": 30.0},
                            {"duration_unit": "y", "min_duration": 1, "price_after_taxes": 15.6}
                        ]
                    }]
                }));
            })
            .await;

        let quote = client_for(&server.base_url(), true)
            .check_availability(&domain())
            .await
            .unwrap();

        mock.assert_async().await;
        let price = quote.price().unwrap();
        assert_eq!(price.amount, 15.6);
        assert_eq!(price.currency, "EUR");
        assert!(!price.used_fallback_rate);
    }

    #[tokio::test]
    async fn test_year_spelled_out_is_accepted() {
        let server = MockServer::start_async().await;
        respond_with(
            &server,
            json!({"products": [{"status": "available", "prices": [
                {"duration_unit": "year", "min_duration": 1, "price_after_taxes": 8.0}
            ]}]}),
        )
        .await;

        let quote = client_for(&server.base_url(), true)
            .check_availability(&domain())
            .await
            .unwrap();

        assert_eq!(quote.amount(), Some(8.0));
    }

    #[tokio::test]
    async fn test_status_gates_parsing_even_with_prices() {
        let server = MockServer::start_async().await;
        respond_with(
            &server,
            json!({"products": [{"status": "unavailable", "prices": [
                {"duration_unit": "y", "min_duration": 1, "price_after_taxes": 12.0}
            ]}]}),
        )
        .await;

        let quote = client_for(&server.base_url(), true)
            .check_availability(&domain())
            .await
            .unwrap();

        assert!(!quote.is_available());
        assert!(quote.price().is_none());
    }

    #[tokio::test]
    async fn test_only_first_product_is_considered() {
        let server = MockServer::start_async().await;
        respond_with(
            &server,
            json!({"products": [
                {"status": "unavailable_premium", "prices": []},
                {"status": "available", "prices": [
                    {"duration_unit": "y", "min_duration": 1, "price_after_taxes": 5.0}
                ]}
            ]}),
        )
        .await;

        let quote = client_for(&server.base_url(), true)
            .check_availability(&domain())
            .await
            .unwrap();

        assert!(!quote.is_available());
    }

    #[tokio::test]
    async fn test_missing_yearly_entry_is_no_pricing_data() {
        let server = MockServer::start_async().await;
        respond_with(
            &server,
            json!({"products": [{"status": "available", "prices": [
                {"duration_unit": "m", "min_duration": 1, "price_after_taxes": 1.0}
            ]}]}),
        )
        .await;

        let err = client_for(&server.base_url(), true)
            .check_availability(&domain())
            .await
            .unwrap_err();

        assert!(matches!(err, LookupError::NoPricingData { .. }));
    }

    #[tokio::test]
    async fn test_absent_products_is_backend_unavailable() {
        let server = MockServer::start_async().await;
        respond_with(&server, json!({"currency": "EUR"})).await;

        let err = client_for(&server.base_url(), true)
            .check_availability(&domain())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LookupError::BackendUnavailable {
                status_code: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_is_backend_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v5/domain/check");
                then.status(401).body("{\"cause\":\"Unauthorized\"}");
            })
            .await;

        let err = client_for(&server.base_url(), true)
            .check_availability(&domain())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LookupError::BackendUnavailable {
                status_code: Some(401),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_key_is_reported_without_request() {
        let err = client_for("http://127.0.0.1:9", false)
            .check_availability(&domain())
            .await
            .unwrap_err();

        assert_eq!(err, LookupError::malformed("missing API credentials"));
    }

    #[tokio::test]
    async fn test_missing_currency_is_treated_as_eur() {
        let server = MockServer::start_async().await;
        respond_with(
            &server,
            json!({"products": [{"status": "available", "prices": [
                {"duration_unit": "y", "min_duration": 1, "price_after_taxes": 9.2}
            ]}]}),
        )
        .await;

        let config = PriceConfig::default()
            .with_gandi(BackendConfig::new(server.base_url()).with_key("gandi-key"))
            .with_target_currency("USD");
        let converter = Arc::new(CurrencyConverter::new(&config).unwrap());
        let quote = GandiClient::new(&config, converter)
            .unwrap()
            .check_availability(&domain())
            .await
            .unwrap();

        let price = quote.price().unwrap();
        assert_eq!(price.original_currency, "EUR");
        assert_eq!(price.currency, "USD");
        assert!((price.amount - 10.0).abs() < 1e-6);
        assert!(price.used_fallback_rate);
    }

    #[tokio::test]
    async fn test_transient_outage_recovers_on_retry() {
        let server = MockServer::start_async().await;
        let outage = server
            .mock_async(|when, then| {
                when.method(GET).path("/v5/domain/check");
                then.status(503).body("busy");
            })
            .await;

        let config = PriceConfig::default()
            .with_gandi(BackendConfig::new(server.base_url()).with_key("gandi-key"))
            .with_retry_backoff(Duration::from_millis(500));
        let converter = Arc::new(CurrencyConverter::new(&config).unwrap());
        let client = GandiClient::new(&config, converter).unwrap();
        let name = domain();

        // Swap the 503 for a real answer once the first attempt has landed
        let recover = async {
            while outage.hits_async().await == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            outage.delete_async().await;
            server
                .mock_async(|when, then| {
                    when.method(GET).path("/v5/domain/check");
                    then.status(200).json_body(json!({"currency": "EUR", "products": [
                        {"status": "available", "prices": [
                            {"duration_unit": "y", "min_duration": 1, "price_after_taxes": 6.5}
                        ]}
                    ]}));
                })
                .await
        };

        let (quote, recovered) = tokio::join!(client.check_availability(&name), recover);

        recovered.assert_async().await;
        assert_eq!(quote.unwrap().amount(), Some(6.5));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let err = client_for("http://127.0.0.1:9", true)
            .check_availability(&domain())
            .await
            .unwrap_err();

        assert!(matches!(err, LookupError::TransportError { .. }));
    }
}

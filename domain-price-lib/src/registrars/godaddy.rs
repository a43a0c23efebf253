//! GoDaddy availability backend.
//!
//! `GET <base>/v1/domains/available?domain=<domain>` answers with
//! `{"available": bool, "price": <micros>, "currency": "USD"}`. Prices are in
//! millionths of the currency unit and are converted to the reporting
//! currency after scaling.

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

pub const REGISTRAR_NAME: &str = "GoDaddy.com";

/// Prices in the availability response are expressed in micro-units.
const MICROS_PER_UNIT: f64 = 1_000_000.0;

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    available: bool,
    #[serde(default)]
    price: Option<u64>,
    #[serde(default)]
    currency: Option<String>,
}

/// Client for the GoDaddy domains API.
pub struct GoDaddyClient {
    id: RegistrarId,
    http_client: reqwest::Client,
    backend: BackendConfig,
    retry_backoff: Duration,
    target_currency: String,
    converter: Arc<CurrencyConverter>,
}

impl GoDaddyClient {
    pub fn new(config: &PriceConfig, converter: Arc<CurrencyConverter>) -> Result<Self, LookupError> {
        Ok(Self {
            id: RegistrarId::new(REGISTRAR_NAME),
            http_client: http_client(config)?,
            backend: config.godaddy.clone(),
            retry_backoff: config.retry_backoff,
            target_currency: config.target_currency.clone(),
            converter,
        })
    }

    /// `sso-key <key>:<secret>`, or `None` when either half is missing.
    fn auth_header(&self) -> Option<String> {
        let key = self.backend.api_key.as_deref().filter(|k| !k.is_empty())?;
        let secret = self.backend.api_secret.as_deref().filter(|s| !s.is_empty())?;
        Some(format!("sso-key {}:{}", key, secret))
    }

    async fn to_quote(
        &self,
        domain: &DomainName,
        response: AvailabilityResponse,
    ) -> Result<Quote, LookupError> {
        if !response.available {
            return Ok(Quote::unavailable(self.id.clone(), domain.clone()));
        }

        let micros = response
            .price
            .ok_or_else(|| LookupError::no_pricing("available response carries no price"))?;
        let original_amount = micros_to_amount(micros);
        let original_currency = response
            .currency
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| "USD".to_string());

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

/// Scale a micro-unit price to whole currency units.
pub fn micros_to_amount(micros: u64) -> f64 {
    micros as f64 / MICROS_PER_UNIT
}

#[async_trait]
impl RegistrarClient for GoDaddyClient {
    fn id(&self) -> &RegistrarId {
        &self.id
    }

    async fn check_availability(&self, domain: &DomainName) -> Result<Quote, LookupError> {
        let auth = self
            .auth_header()
            .ok_or_else(|| LookupError::malformed("missing API credentials"))?;

        let url = format!("{}/v1/domains/available", self.backend.base());
        debug!(registrar = %self.id, domain = %domain, "Checking availability");

        let response = send_with_retry(&self.id, self.retry_backoff, || {
            self.http_client
                .get(&url)
                .query(&[("domain", domain.as_str())])
                .header("Authorization", auth.as_str())
                .header("Accept", "application/json")
        })
        .await?;

        if response.status() != StatusCode::OK {
            return Err(unavailable_from(response).await);
        }

        let body: AvailabilityResponse = response.json().await?;
        self.to_quote(domain, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(base_url: &str, with_credentials: bool) -> GoDaddyClient {
        let mut backend = BackendConfig::new(base_url);
        if with_credentials {
            backend = backend.with_key("key").with_secret("secret");
        }
        let config = PriceConfig::default()
            .with_godaddy(backend)
            .with_retry_backoff(Duration::from_millis(10));
        let converter = Arc::new(CurrencyConverter::new(&config).unwrap());
        GoDaddyClient::new(&config, converter).unwrap()
    }

    fn domain() -> DomainName {
        DomainName::parse("example.com").unwrap()
    }

    #[test]
    fn test_micros_scaling() {
        assert_eq!(micros_to_amount(10_000_000), 10.0);
        assert_eq!(micros_to_amount(11_990_000), 11.99);
        assert_eq!(micros_to_amount(0), 0.0);
    }

    #[tokio::test]
    async fn test_available_domain_scales_micros_before_conversion() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v1/domains/available")
                    .query_param("domain", "example.com")
                    .header("Authorization", "sso-key key:secret");
                then.status(200)
                    .json_body(json!({"available": true, "price": 10_000_000, "currency": "USD"}));
            })
            .await;

        let quote = client_for(&server.base_url(), true)
            .check_availability(&domain())
            .await
            .unwrap();

        mock.assert_async().await;
        let price = quote.price().unwrap();
        assert!(quote.is_available());
        assert_eq!(price.original_amount, 10.0);
        assert_eq!(price.original_currency, "USD");
        assert_eq!(price.currency, "EUR");
        // No rate-service key configured, so the fallback rate applies
        assert!(price.used_fallback_rate);
        assert!((price.amount - 9.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_taken_domain_is_unavailable_quote() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/domains/available");
                then.status(200)
                    .json_body(json!({"available": false, "domain": "example.com"}));
            })
            .await;

        let quote = client_for(&server.base_url(), true)
            .check_availability(&domain())
            .await
            .unwrap();

        assert!(!quote.is_available());
        assert!(quote.price().is_none());
    }

    #[tokio::test]
    async fn test_available_without_price_is_no_pricing_data() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/domains/available");
                then.status(200).json_body(json!({"available": true}));
            })
            .await;

        let err = client_for(&server.base_url(), true)
            .check_availability(&domain())
            .await
            .unwrap_err();

        assert!(matches!(err, LookupError::NoPricingData { .. }));
    }

    #[tokio::test]
    async fn test_non_200_is_backend_unavailable_with_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/domains/available");
                then.status(403).body("{\"code\":\"ACCESS_DENIED\"}");
            })
            .await;

        let err = client_for(&server.base_url(), true)
            .check_availability(&domain())
            .await
            .unwrap_err();

        match err {
            LookupError::BackendUnavailable { status_code, body } => {
                assert_eq!(status_code, Some(403));
                assert!(body.contains("ACCESS_DENIED"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_retried_once() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/domains/available");
                then.status(503).body("busy");
            })
            .await;

        let err = client_for(&server.base_url(), true)
            .check_availability(&domain())
            .await
            .unwrap_err();

        assert_eq!(mock.hits_async().await, 2);
        assert!(matches!(
            err,
            LookupError::BackendUnavailable {
                status_code: Some(503),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_backend_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/domains/available");
                then.status(200).json_body(json!({"price": 5}));
            })
            .await;

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
    async fn test_missing_credentials_skip_network() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200);
            })
            .await;

        let err = client_for(&server.base_url(), false)
            .check_availability(&domain())
            .await
            .unwrap_err();

        assert_eq!(mock.hits_async().await, 0);
        assert_eq!(err, LookupError::malformed("missing API credentials"));
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

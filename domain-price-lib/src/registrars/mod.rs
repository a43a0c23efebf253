//! Registrar backends.
//!
//! Each backend speaks its own HTTP API and response shape; all of them are
//! normalized behind [`RegistrarClient`] into a [`Quote`] or a [`LookupError`].

use crate::currency::CurrencyConverter;
use crate::error::LookupError;
use crate::types::{DomainName, PriceConfig, Quote, RegistrarId};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Micros-priced availability API (GoDaddy)
#[cfg(feature = "godaddy")]
pub mod godaddy;

/// Product-catalog availability API (Gandi)
#[cfg(feature = "gandi")]
pub mod gandi;

#[cfg(feature = "gandi")]
pub use gandi::GandiClient;
#[cfg(feature = "godaddy")]
pub use godaddy::GoDaddyClient;

/// Longest response body kept in a [`LookupError::BackendUnavailable`].
const MAX_ERROR_BODY: usize = 512;

/// Capability shared by every registrar backend.
#[async_trait]
pub trait RegistrarClient: Send + Sync {
    /// Name the registrar is reported under.
    fn id(&self) -> &RegistrarId;

    /// Ask the registrar whether `domain` can be registered and at what
    /// yearly price.
    ///
    /// "Not available" is a successful answer (`Quote::unavailable`); only
    /// operational problems are errors.
    async fn check_availability(&self, domain: &DomainName) -> Result<Quote, LookupError>;
}

/// Build every compiled-in registrar client, in the order they are consulted.
///
/// Clients share one [`CurrencyConverter`]. Missing credentials do not fail
/// here; the affected client reports it on each lookup instead.
#[allow(unused_mut, unused_variables)] // every backend can be compiled out
pub fn build_clients(config: &PriceConfig) -> Result<Vec<Arc<dyn RegistrarClient>>, LookupError> {
    let converter = Arc::new(CurrencyConverter::new(config)?);
    let mut clients: Vec<Arc<dyn RegistrarClient>> = Vec::new();

    #[cfg(feature = "godaddy")]
    clients.push(Arc::new(GoDaddyClient::new(config, converter.clone())?));

    #[cfg(feature = "gandi")]
    clients.push(Arc::new(GandiClient::new(config, converter.clone())?));

    Ok(clients)
}

/// Build the HTTP client a registrar backend uses.
pub(crate) fn http_client(config: &PriceConfig) -> Result<reqwest::Client, LookupError> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .user_agent(concat!("domain-price/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| LookupError::transport(format!("failed to build HTTP client: {}", e)))
}

/// Send a request, retrying once after `backoff` on a transport error,
/// HTTP 429, or a 5xx status.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed
/// by sending.
pub(crate) async fn send_with_retry<F>(
    registrar: &RegistrarId,
    backoff: Duration,
    build: F,
) -> Result<Response, LookupError>
where
    F: Fn() -> RequestBuilder,
{
    match build().send().await {
        Ok(response) if !should_retry_status(response.status()) => return Ok(response),
        Ok(response) => {
            debug!(
                registrar = %registrar,
                status = %response.status(),
                "Transient status, retrying after {:?}",
                backoff
            );
        }
        Err(e) => {
            debug!(
                registrar = %registrar,
                error = %e,
                "Request failed, retrying after {:?}",
                backoff
            );
        }
    }

    tokio::time::sleep(backoff).await;
    build().send().await.map_err(LookupError::from)
}

fn should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Turn a non-success response into `BackendUnavailable`, keeping a bounded
/// slice of the body for diagnostics.
pub(crate) async fn unavailable_from(response: Response) -> LookupError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    LookupError::unavailable(status, truncate(&body, MAX_ERROR_BODY))
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }

    #[test]
    fn test_retry_statuses() {
        assert!(should_retry_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry_status(StatusCode::BAD_GATEWAY));
        assert!(!should_retry_status(StatusCode::UNAUTHORIZED));
        assert!(!should_retry_status(StatusCode::OK));
    }

    #[test]
    fn test_build_clients_in_configured_order() {
        let clients = build_clients(&PriceConfig::default()).unwrap();
        let names: Vec<&str> = clients.iter().map(|c| c.id().as_str()).collect();
        assert_eq!(names, vec!["GoDaddy.com", "Gandi.net"]);
    }
}

//! Quote aggregation across registrars.
//!
//! This module provides the [`QuoteAggregator`], which asks every configured
//! registrar about one domain, keeps each answer (or error) in configured
//! order, and picks the cheapest available offer.

use crate::error::DomainPriceError;
use crate::registrars::{build_clients, RegistrarClient};
use crate::types::{
    AggregateResult, DomainName, PriceConfig, ProgressEvent, ProgressSink, Quote,
    RegistrarOutcome,
};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Coordinates lookups against every registrar for a domain.
///
/// Registrars are queried concurrently. A failure or "not available" answer
/// from one registrar never prevents the others from being evaluated.
///
/// # Example
///
/// ```rust,no_run
/// use domain_price_lib::{PriceConfig, QuoteAggregator};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let aggregator = QuoteAggregator::from_config(&PriceConfig::default())?;
///     let result = aggregator.check_domain("example.com").await?;
///
///     if let Some(best) = result.best_quote {
///         println!("{} at {:?}", best.registrar(), best.amount());
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct QuoteAggregator {
    clients: Vec<Arc<dyn RegistrarClient>>,
}

impl QuoteAggregator {
    /// Aggregate over the given clients; their order is the tie-break order.
    pub fn new(clients: Vec<Arc<dyn RegistrarClient>>) -> Self {
        Self { clients }
    }

    /// Build the compiled-in registrar clients from configuration.
    pub fn from_config(config: &PriceConfig) -> Result<Self, DomainPriceError> {
        let clients = build_clients(config)
            .map_err(|e| DomainPriceError::internal(format!("Failed to build clients: {}", e)))?;
        Ok(Self::new(clients))
    }

    pub fn clients(&self) -> &[Arc<dyn RegistrarClient>] {
        &self.clients
    }

    /// Validate `domain` and aggregate quotes for it.
    pub async fn check_domain(&self, domain: &str) -> Result<AggregateResult, DomainPriceError> {
        let domain = DomainName::parse(domain)?;
        Ok(self.aggregate(&domain).await)
    }

    /// Aggregate quotes for an already validated domain.
    pub async fn aggregate(&self, domain: &DomainName) -> AggregateResult {
        self.aggregate_with_progress(domain, None).await
    }

    /// Aggregate quotes, reporting each registrar's completion to `progress`.
    pub async fn aggregate_with_progress(
        &self,
        domain: &DomainName,
        progress: Option<&ProgressSink>,
    ) -> AggregateResult {
        let lookups = self.clients.iter().map(|client| async move {
            let result = client.check_availability(domain).await;

            match &result {
                Ok(quote) => debug!(
                    registrar = %client.id(),
                    domain = %domain,
                    available = quote.is_available(),
                    price = ?quote.amount(),
                    "Quote received"
                ),
                Err(e) => warn!(registrar = %client.id(), domain = %domain, error = %e, "Lookup failed"),
            }

            if let Some(sink) = progress {
                sink(ProgressEvent::RegistrarDone {
                    domain: domain.clone(),
                    registrar: client.id().clone(),
                    ok: result.is_ok(),
                });
            }

            RegistrarOutcome {
                registrar: client.id().clone(),
                result,
            }
        });

        // join_all keeps input order regardless of completion order
        let all_quotes = join_all(lookups).await;
        let best_quote = select_best(all_quotes.iter().filter_map(|o| o.result.as_ref().ok()));

        AggregateResult {
            domain: domain.clone(),
            best_quote,
            all_quotes,
        }
    }
}

/// Whether `candidate` strictly beats `current`.
///
/// Only available quotes with a finite price compete. Equal prices do not
/// beat the incumbent, so the earliest quote wins ties.
pub(crate) fn is_cheaper(candidate: &Quote, current: Option<&Quote>) -> bool {
    let Some(price) = priced(candidate) else {
        return false;
    };
    match current.and_then(priced) {
        Some(best) => price < best,
        None => true,
    }
}

fn priced(quote: &Quote) -> Option<f64> {
    if !quote.is_available() {
        return None;
    }
    quote.amount().filter(|a| a.is_finite())
}

/// Pick the cheapest available quote; the first one wins on equal price.
pub fn select_best<'a, I>(quotes: I) -> Option<Quote>
where
    I: IntoIterator<Item = &'a Quote>,
{
    let mut best: Option<&Quote> = None;
    for quote in quotes {
        if is_cheaper(quote, best) {
            best = Some(quote);
        }
    }
    best.cloned()
}

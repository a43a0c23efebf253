//! Core data types for quote aggregation.
//!
//! This module defines the value objects that flow through the library:
//! validated domain names, registrar quotes, aggregate and sweep results,
//! exchange rates, progress events, and the configuration value object.

use crate::error::{DomainPriceError, LookupError};
use crate::utils::validate_domain;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// A syntactically valid, lower-cased domain name (e.g. "example.com").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    /// Validate and normalize a domain name.
    ///
    /// Surrounding whitespace and a trailing root dot are stripped, and the
    /// name is lower-cased before validation.
    pub fn parse(input: &str) -> Result<Self, DomainPriceError> {
        let normalized = input.trim().trim_end_matches('.').to_lowercase();
        validate_domain(&normalized)?;
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The leading label ("example" for "example.co.uk").
    pub fn root_label(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// Everything after the leading label ("co.uk" for "example.co.uk").
    pub fn suffix(&self) -> &str {
        self.0.split_once('.').map(|(_, rest)| rest).unwrap_or("")
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DomainName {
    type Err = DomainPriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DomainName {
    type Error = DomainPriceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DomainName> for String {
    fn from(value: DomainName) -> Self {
        value.0
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Display name identifying a registrar backend (e.g. "GoDaddy.com").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrarId(String);

impl RegistrarId {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A yearly registration price in the reporting currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the reporting currency
    pub amount: f64,

    /// ISO code of the reporting currency (e.g. "EUR")
    pub currency: String,

    /// Amount as the registrar quoted it, before conversion
    pub original_amount: f64,

    /// ISO code the registrar quoted in
    pub original_currency: String,

    /// True when conversion used the fixed fallback rate instead of a live one
    pub used_fallback_rate: bool,
}

impl Price {
    /// A price quoted directly in the reporting currency.
    pub fn native<C: Into<String>>(amount: f64, currency: C) -> Self {
        let currency = currency.into();
        Self {
            amount,
            original_amount: amount,
            original_currency: currency.clone(),
            currency,
            used_fallback_rate: false,
        }
    }
}

/// One registrar's availability and price answer for one domain.
///
/// A quote is either available with a price, or unavailable without one; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    registrar: RegistrarId,
    domain: DomainName,
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<Price>,
}

impl Quote {
    /// The domain can be registered at this price.
    pub fn available(registrar: RegistrarId, domain: DomainName, price: Price) -> Self {
        Self {
            registrar,
            domain,
            available: true,
            price: Some(price),
        }
    }

    /// The domain is taken (or otherwise not offered) at this registrar.
    pub fn unavailable(registrar: RegistrarId, domain: DomainName) -> Self {
        Self {
            registrar,
            domain,
            available: false,
            price: None,
        }
    }

    pub fn registrar(&self) -> &RegistrarId {
        &self.registrar
    }

    pub fn domain(&self) -> &DomainName {
        &self.domain
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn price(&self) -> Option<&Price> {
        self.price.as_ref()
    }

    /// Price amount in the reporting currency, if the domain is available.
    pub fn amount(&self) -> Option<f64> {
        self.price.as_ref().map(|p| p.amount)
    }
}

/// The outcome of asking one registrar about one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrarOutcome {
    pub registrar: RegistrarId,
    pub result: Result<Quote, LookupError>,
}

/// Every registrar's answer for one domain plus the best available offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub domain: DomainName,

    /// Cheapest available quote; first registrar in configured order wins ties
    pub best_quote: Option<Quote>,

    /// One entry per registrar, in configured order
    pub all_quotes: Vec<RegistrarOutcome>,
}

impl AggregateResult {
    /// Quotes that came back successfully, available or not.
    pub fn quotes(&self) -> impl Iterator<Item = &Quote> {
        self.all_quotes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Registrars that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&RegistrarId, &LookupError)> {
        self.all_quotes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.registrar, e)))
    }

    /// Whether every registrar failed outright.
    pub fn all_failed(&self) -> bool {
        !self.all_quotes.is_empty() && self.all_quotes.iter().all(|o| o.result.is_err())
    }
}

/// One TLD candidate's row in a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub domain: DomainName,

    /// Best price for this domain, if any registrar offered it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    /// Registrar holding the best price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<RegistrarId>,

    /// Full per-registrar detail for this domain
    pub aggregate: AggregateResult,
}

/// Result of checking every TLD candidate for a base name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub base_name: String,

    /// One entry per candidate, in candidate order
    pub entries: Vec<SweepEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cheapest_domain: Option<DomainName>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cheapest_quote: Option<Quote>,
}

impl SweepResult {
    /// Look up the row for a fully qualified domain.
    pub fn entry(&self, domain: &str) -> Option<&SweepEntry> {
        self.entries.iter().find(|e| e.domain.as_str() == domain)
    }

    /// Rows that carry a price.
    pub fn priced(&self) -> impl Iterator<Item = &SweepEntry> {
        self.entries.iter().filter(|e| e.price.is_some())
    }
}

/// A conversion rate between two currencies at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRate {
    pub base: String,
    pub target: String,
    pub rate: f64,
    pub fetched_at: SystemTime,
}

/// Result of a currency conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub amount: f64,
    pub rate: f64,
    /// True when the live rate could not be used
    pub used_fallback: bool,
}

/// Real progress milestones emitted while an aggregation or sweep runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// One registrar finished answering for one domain.
    RegistrarDone {
        domain: DomainName,
        registrar: RegistrarId,
        ok: bool,
    },

    /// All registrars finished for one sweep candidate.
    DomainDone {
        domain: DomainName,
        completed: usize,
        total: usize,
    },
}

/// Shared callback receiving progress milestones.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Endpoint and credentials for one external HTTP service.
#[derive(Clone, Default, PartialEq)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl BackendConfig {
    pub fn new<U: Into<String>>(base_url: U) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            api_secret: None,
        }
    }

    pub fn with_key<K: Into<String>>(mut self, key: K) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_secret<S: Into<String>>(mut self, secret: S) -> Self {
        self.api_secret = Some(secret.into());
        self
    }

    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &redact(&self.api_secret))
            .finish()
    }
}

pub const DEFAULT_GODADDY_URL: &str = "https://api.ote-godaddy.com";
pub const DEFAULT_GANDI_URL: &str = "https://api.gandi.net";
pub const DEFAULT_RATES_URL: &str = "https://v6.exchangerate-api.com/v6";

/// Configuration value object for quote lookups.
///
/// Built once at startup and handed to each client constructor; nothing in
/// the library reads the environment at call time.
#[derive(Debug, Clone)]
pub struct PriceConfig {
    /// Maximum number of domains checked at once during a sweep
    /// Default: 4, Range: 1-32
    pub concurrency: usize,

    /// Transport-level timeout for each HTTP request
    /// Default: 10 seconds
    pub request_timeout: Duration,

    /// Delay before the single retry of a transient failure
    /// Default: 250 milliseconds
    pub retry_backoff: Duration,

    /// Currency every quote is reported in
    /// Default: "EUR"
    pub target_currency: String,

    /// Rate from `fallback_from` to `fallback_to` used when the live rate
    /// cannot be fetched. The reverse pair uses its reciprocal.
    /// Default: 0.92
    pub fallback_rate: f64,

    /// Source currency of the fallback rate
    /// Default: "USD"
    pub fallback_from: String,

    /// Target currency of the fallback rate
    /// Default: "EUR"
    pub fallback_to: String,

    /// How long a fetched exchange rate is reused; `None` fetches every time
    /// Default: 5 minutes
    pub rate_cache_ttl: Option<Duration>,

    /// TLD candidates used when a sweep is given none
    pub default_tlds: Vec<String>,

    /// User-defined TLD presets from config files
    pub custom_presets: HashMap<String, Vec<String>>,

    pub godaddy: BackendConfig,
    pub gandi: BackendConfig,
    pub rates: BackendConfig,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            request_timeout: Duration::from_secs(10),
            retry_backoff: Duration::from_millis(250),
            target_currency: "EUR".to_string(),
            fallback_rate: 0.92,
            fallback_from: "USD".to_string(),
            fallback_to: "EUR".to_string(),
            rate_cache_ttl: Some(Duration::from_secs(300)),
            default_tlds: crate::presets::DEFAULT_TLDS
                .iter()
                .map(|t| t.to_string())
                .collect(),
            custom_presets: HashMap::new(),
            godaddy: BackendConfig::new(DEFAULT_GODADDY_URL),
            gandi: BackendConfig::new(DEFAULT_GANDI_URL),
            rates: BackendConfig::new(DEFAULT_RATES_URL),
        }
    }
}

impl PriceConfig {
    /// Set sweep concurrency, clamped to 1-32.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, 32);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_target_currency<C: Into<String>>(mut self, currency: C) -> Self {
        self.target_currency = currency.into().to_uppercase();
        self
    }

    pub fn with_fallback_rate(mut self, rate: f64) -> Self {
        self.fallback_rate = rate;
        self
    }

    /// Set the currency pair the fallback rate converts between.
    pub fn with_fallback_pair<F: Into<String>, T: Into<String>>(mut self, from: F, to: T) -> Self {
        self.fallback_from = from.into().to_uppercase();
        self.fallback_to = to.into().to_uppercase();
        self
    }

    pub fn with_rate_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.rate_cache_ttl = ttl;
        self
    }

    pub fn with_default_tlds(mut self, tlds: Vec<String>) -> Self {
        self.default_tlds = tlds;
        self
    }

    pub fn with_godaddy(mut self, backend: BackendConfig) -> Self {
        self.godaddy = backend;
        self
    }

    pub fn with_gandi(mut self, backend: BackendConfig) -> Self {
        self.gandi = backend;
        self
    }

    pub fn with_rates(mut self, backend: BackendConfig) -> Self {
        self.rates = backend;
        self
    }
}

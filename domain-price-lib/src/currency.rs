//! Currency conversion with a fixed fallback rate.
//!
//! Rates come from an exchangerate-api style service
//! (`GET <base>/<apikey>/latest/<CUR>`). Conversion never fails outward: any
//! problem reaching or reading the service degrades to the configured fallback
//! rate and is reported through [`Conversion::used_fallback`]. The fallback rate
//! only knows one currency pair; other pairs pass through unconverted.

use crate::error::LookupError;
use crate::types::{BackendConfig, Conversion, ExchangeRate, PriceConfig};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct RatesResponse {
    conversion_rates: Option<HashMap<String, f64>>,
}

/// Rates for one base currency, kept until the TTL runs out.
struct CachedRates {
    rates: HashMap<String, f64>,
    fetched_at: SystemTime,
    loaded: Instant,
}

/// Converts registrar prices into the reporting currency.
pub struct CurrencyConverter {
    http_client: reqwest::Client,
    service: BackendConfig,
    fallback_rate: f64,
    fallback_from: String,
    fallback_to: String,
    cache_ttl: Option<Duration>,
    cache: Mutex<HashMap<String, CachedRates>>,
}

impl CurrencyConverter {
    /// Create a converter from the shared configuration.
    pub fn new(config: &PriceConfig) -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LookupError::transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            service: config.rates.clone(),
            fallback_rate: config.fallback_rate,
            fallback_from: config.fallback_from.to_uppercase(),
            fallback_to: config.fallback_to.to_uppercase(),
            cache_ttl: config.rate_cache_ttl,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// The rate used when the live service is unusable.
    pub fn fallback_rate(&self) -> f64 {
        self.fallback_rate
    }

    /// The fallback rate for `from -> to`, if the fallback pair covers it.
    pub fn fallback_rate_for(&self, from: &str, to: &str) -> Option<f64> {
        if from == self.fallback_from && to == self.fallback_to {
            Some(self.fallback_rate)
        } else if from == self.fallback_to && to == self.fallback_from {
            Some(1.0 / self.fallback_rate)
        } else {
            None
        }
    }

    /// Convert `amount` from one currency to another.
    ///
    /// Same-currency conversions are returned unchanged without a network
    /// call. Any failure to obtain a live rate falls back to the fixed rate
    /// (or its reciprocal) with `used_fallback` set. A pair the fallback rate
    /// does not cover is returned unconverted, also with `used_fallback` set.
    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> Conversion {
        let from = from.to_uppercase();
        let to = to.to_uppercase();

        if from == to {
            return Conversion {
                amount,
                rate: 1.0,
                used_fallback: false,
            };
        }

        match self.fetch_rate(&from, &to).await {
            Ok(rate) => Self::convert_with_rate(amount, &rate),
            Err(e) => match self.fallback_rate_for(&from, &to) {
                Some(rate) => {
                    warn!(
                        from = %from,
                        to = %to,
                        fallback_rate = rate,
                        error = %e,
                        "Exchange rate unavailable, using fallback rate"
                    );
                    Conversion {
                        amount: amount * rate,
                        rate,
                        used_fallback: true,
                    }
                }
                None => {
                    warn!(
                        from = %from,
                        to = %to,
                        error = %e,
                        "Exchange rate unavailable and no fallback for this pair, amount left unconverted"
                    );
                    Conversion {
                        amount,
                        rate: 1.0,
                        used_fallback: true,
                    }
                }
            },
        }
    }

    /// Convert with a rate the caller already holds.
    pub fn convert_with_rate(amount: f64, rate: &ExchangeRate) -> Conversion {
        Conversion {
            amount: amount * rate.rate,
            rate: rate.rate,
            used_fallback: false,
        }
    }

    /// Fetch the live rate from `base` to `target`, consulting the cache first.
    pub async fn fetch_rate(&self, base: &str, target: &str) -> Result<ExchangeRate, LookupError> {
        if let Some(rate) = self.cached_rate(base, target) {
            debug!(base, target, rate = rate.rate, "Using cached exchange rate");
            return Ok(rate);
        }

        let rates = self.fetch_rates(base).await?;
        let rate = lookup_rate(&rates, target)?;
        let fetched_at = SystemTime::now();

        if self.cache_ttl.is_some() {
            if let Ok(mut cache) = self.cache.lock() {
                cache.insert(
                    base.to_string(),
                    CachedRates {
                        rates,
                        fetched_at,
                        loaded: Instant::now(),
                    },
                );
            }
        }

        Ok(ExchangeRate {
            base: base.to_string(),
            target: target.to_string(),
            rate,
            fetched_at,
        })
    }

    fn cached_rate(&self, base: &str, target: &str) -> Option<ExchangeRate> {
        let ttl = self.cache_ttl?;
        let cache = self.cache.lock().ok()?;
        let entry = cache.get(base)?;

        if entry.loaded.elapsed() > ttl {
            return None;
        }

        let rate = lookup_rate(&entry.rates, target).ok()?;
        Some(ExchangeRate {
            base: base.to_string(),
            target: target.to_string(),
            rate,
            fetched_at: entry.fetched_at,
        })
    }

    async fn fetch_rates(&self, base: &str) -> Result<HashMap<String, f64>, LookupError> {
        let api_key = self
            .service
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LookupError::malformed("missing exchange rate API key"))?;

        let url = format!("{}/{}/latest/{}", self.service.base(), api_key, base);
        debug!(base, "Fetching exchange rates");

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::unavailable(status.as_u16(), body));
        }

        let payload: RatesResponse = response.json().await?;
        payload
            .conversion_rates
            .ok_or_else(|| LookupError::malformed("response has no conversion_rates"))
    }
}

fn lookup_rate(rates: &HashMap<String, f64>, target: &str) -> Result<f64, LookupError> {
    match rates.get(target) {
        Some(rate) if rate.is_finite() && *rate > 0.0 => Ok(*rate),
        Some(rate) => Err(LookupError::malformed(format!(
            "non-positive rate {} for {}",
            rate, target
        ))),
        None => Err(LookupError::malformed(format!("no rate for {}", target))),
    }
}

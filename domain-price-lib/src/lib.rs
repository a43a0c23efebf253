//! # Domain Price Library
//!
//! Find the cheapest registrar offer for a domain, or the cheapest TLD
//! variant of a name, by querying several registrar pricing APIs at once.
//!
//! Every registrar answer is kept, including failures, so callers can always
//! see why a registrar has no offer. Prices are reported in one currency.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_price_lib::{PriceConfig, QuoteAggregator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let aggregator = QuoteAggregator::from_config(&PriceConfig::default())?;
//!     let result = aggregator.check_domain("example.com").await?;
//!
//!     match result.best_quote {
//!         Some(best) => println!("{} at {:?}", best.registrar(), best.amount()),
//!         None => println!("No offer for {}", result.domain),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **GoDaddy / Gandi backends**: each behind its own cargo feature
//! - **Partial failures**: one registrar failing never hides another's offer
//! - **TLD sweeps**: bounded concurrency, deterministic tie-breaks
//! - **Currency conversion**: live rates with a configured fallback
//! - **Background runner**: start an operation and drain its events later

// Re-export main public API types and functions
pub use aggregator::{select_best, QuoteAggregator};
pub use config::{
    load_env_config, load_env_from, parse_duration_string, ConfigManager, CurrencyConfig,
    DefaultsConfig, EndpointConfig, EnvConfig, FileConfig, RegistrarsConfig,
};
pub use currency::CurrencyConverter;
pub use error::{DomainPriceError, LookupError};
pub use presets::{get_available_presets, get_preset_tlds, get_preset_tlds_with_custom};
pub use registrars::{build_clients, RegistrarClient};
pub use runner::{Operation, TaskEvent, TaskId, TaskOutput, TaskRunner};
pub use sweep::{candidate_domains, TldSweeper};
pub use types::{
    AggregateResult, BackendConfig, Conversion, DomainName, ExchangeRate, Price, PriceConfig,
    ProgressEvent, ProgressSink, Quote, RegistrarId, RegistrarOutcome, SweepEntry, SweepResult,
    DEFAULT_GANDI_URL, DEFAULT_GODADDY_URL, DEFAULT_RATES_URL,
};

#[cfg(feature = "gandi")]
pub use registrars::GandiClient;
#[cfg(feature = "godaddy")]
pub use registrars::GoDaddyClient;

pub mod registrars;

mod aggregator;
mod config;
mod currency;
mod error;
mod presets;
mod runner;
mod sweep;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DomainPriceError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        features: get_enabled_features(),
    }
}

/// Information about the library build and features
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub features: Vec<&'static str>,
}

/// Registrar backends compiled into this build
#[allow(clippy::vec_init_then_push)]
fn get_enabled_features() -> Vec<&'static str> {
    let mut features = Vec::new();

    #[cfg(feature = "godaddy")]
    features.push("godaddy");

    #[cfg(feature = "gandi")]
    features.push("gandi");

    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_lists_default_backends() {
        let info = info();
        assert_eq!(info.version, VERSION);
        assert!(info.features.contains(&"godaddy"));
        assert!(info.features.contains(&"gandi"));
    }
}

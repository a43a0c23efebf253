//! Error handling for quote lookups and aggregation.
//!
//! Two layers of errors live here. [`LookupError`] describes why a single
//! registrar could not produce a quote; it is captured per registrar and never
//! aborts an aggregation or sweep. [`DomainPriceError`] covers the failures a
//! caller can actually see: bad input, bad configuration, or a busy runner.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why one registrar failed to answer for one domain.
///
/// "Domain not available" is not represented here: that is a successful lookup
/// and comes back as a [`Quote`](crate::Quote) with `available == false`.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupError {
    /// The backend could not be reached (timeout, DNS, connection refused).
    #[error("transport error: {cause}")]
    TransportError { cause: String },

    /// The backend answered with a non-success status, an unreadable payload,
    /// or the request could not be authorized.
    #[error("{}", format_unavailable(.status_code, .body))]
    BackendUnavailable {
        status_code: Option<u16>,
        body: String,
    },

    /// The backend recognized the domain as available but gave no usable price.
    #[error("no pricing data: {reason}")]
    NoPricingData { reason: String },
}

fn format_unavailable(status_code: &Option<u16>, body: &str) -> String {
    match status_code {
        Some(code) => format!("backend unavailable (HTTP {}): {}", code, body),
        None => format!("backend unavailable: {}", body),
    }
}

impl LookupError {
    /// Create a transport error from any displayable cause.
    pub fn transport<C: ToString>(cause: C) -> Self {
        Self::TransportError {
            cause: cause.to_string(),
        }
    }

    /// Create a backend error carrying the HTTP status and response body.
    pub fn unavailable<B: Into<String>>(status_code: u16, body: B) -> Self {
        Self::BackendUnavailable {
            status_code: Some(status_code),
            body: body.into(),
        }
    }

    /// Create a backend error for a malformed payload or local precondition.
    pub fn malformed<B: Into<String>>(body: B) -> Self {
        Self::BackendUnavailable {
            status_code: None,
            body: body.into(),
        }
    }

    /// Create a missing-price error.
    pub fn no_pricing<R: Into<String>>(reason: R) -> Self {
        Self::NoPricingData {
            reason: reason.into(),
        }
    }

    /// Whether one more attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransportError { .. }
                | Self::BackendUnavailable {
                    status_code: Some(429 | 500..=599),
                    ..
                }
        )
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::malformed(format!("unreadable response body: {}", err))
        } else if err.is_timeout() {
            Self::transport(format!("request timed out: {}", err))
        } else if err.is_connect() {
            Self::transport(format!("connection failed: {}", err))
        } else {
            Self::transport(err)
        }
    }
}

/// Main error type for caller-visible failures.
#[derive(Debug, Clone, Error)]
pub enum DomainPriceError {
    /// Input is not a usable domain or base name.
    #[error("Invalid domain '{domain}': {reason}")]
    InvalidDomain { domain: String, reason: String },

    /// Configuration could not be parsed or failed validation.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Configuration or input file could not be read.
    #[error("File error at '{path}': {message}")]
    FileError { path: String, message: String },

    /// The task runner already has an operation in flight.
    #[error("An operation is already running (task {active})")]
    Busy { active: u64 },

    /// Anything that does not fit the categories above.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainPriceError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for DomainPriceError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML configuration: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LookupError::transport("connection refused").is_retryable());
        assert!(LookupError::unavailable(503, "maintenance").is_retryable());
        assert!(LookupError::unavailable(429, "slow down").is_retryable());
        assert!(!LookupError::unavailable(401, "bad key").is_retryable());
        assert!(!LookupError::malformed("missing field").is_retryable());
        assert!(!LookupError::no_pricing("no yearly price").is_retryable());
    }

    #[test]
    fn test_display_includes_status() {
        let err = LookupError::unavailable(403, "forbidden");
        assert_eq!(err.to_string(), "backend unavailable (HTTP 403): forbidden");

        let err = LookupError::malformed("missing API credentials");
        assert_eq!(err.to_string(), "backend unavailable: missing API credentials");
    }

    #[test]
    fn test_lookup_error_serializes_with_kind_tag() {
        let json = serde_json::to_value(LookupError::no_pricing("empty price list")).unwrap();
        assert_eq!(json["kind"], "no_pricing_data");
        assert_eq!(json["reason"], "empty price list");
    }
}

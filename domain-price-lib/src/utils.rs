//! Utility functions for domain processing and validation.
//!
//! This module contains helpers for validating domain names, deriving the
//! root label of a base name, and normalizing TLD candidates.

use crate::error::DomainPriceError;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// One LDH label: alphanumeric ends, hyphens allowed inside, 1-63 chars.
    static ref LABEL_RE: Regex =
        Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$").expect("valid label regex");

    /// A TLD label: alphabetic, or an IDNA "xn--" form.
    static ref TLD_RE: Regex =
        Regex::new(r"^(?:[a-z]{2,63}|xn--[a-z0-9-]{1,59})$").expect("valid TLD regex");
}

/// Validate an already lower-cased domain name.
///
/// The name must be a dot-separated label sequence with a non-empty leading
/// label and a TLD of known format.
pub fn validate_domain(domain: &str) -> Result<(), DomainPriceError> {
    if domain.is_empty() {
        return Err(DomainPriceError::invalid_domain(
            domain,
            "Domain name cannot be empty",
        ));
    }

    if domain.len() > 253 {
        return Err(DomainPriceError::invalid_domain(
            domain,
            "Domain name exceeds 253 characters",
        ));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    let Some((tld, rest)) = labels.split_last() else {
        return Err(DomainPriceError::invalid_domain(domain, "Missing TLD"));
    };

    if rest.is_empty() {
        return Err(DomainPriceError::invalid_domain(
            domain,
            "Domain name must include a TLD (e.g. example.com)",
        ));
    }

    for label in rest {
        if !LABEL_RE.is_match(label) {
            return Err(DomainPriceError::invalid_domain(
                domain,
                format!("Invalid label '{}'", label),
            ));
        }
    }

    if !TLD_RE.is_match(tld) {
        return Err(DomainPriceError::invalid_domain(
            domain,
            format!("Unrecognized TLD format '{}'", tld),
        ));
    }

    Ok(())
}

/// Derive the root label of a base name.
///
/// Takes the portion before the first '.', so "example", "example.com" and
/// "Example.co.uk" all yield "example".
pub fn root_label(base_name: &str) -> Result<String, DomainPriceError> {
    let trimmed = base_name.trim().to_lowercase();
    let root = trimmed.split('.').next().unwrap_or("");

    if root.is_empty() {
        return Err(DomainPriceError::invalid_domain(
            base_name,
            "Base name has an empty leading label",
        ));
    }

    if !LABEL_RE.is_match(root) {
        return Err(DomainPriceError::invalid_domain(
            base_name,
            format!("Invalid base label '{}'", root),
        ));
    }

    Ok(root.to_string())
}

/// Normalize a TLD candidate: ".COM", "com" and " .com " all become "com".
///
/// Multi-level suffixes such as "co.uk" are kept as-is.
pub fn normalize_tld(candidate: &str) -> Result<String, DomainPriceError> {
    let tld = candidate.trim().trim_start_matches('.').to_lowercase();

    if tld.is_empty() {
        return Err(DomainPriceError::invalid_domain(
            candidate,
            "TLD candidate cannot be empty",
        ));
    }

    let labels: Vec<&str> = tld.split('.').collect();
    let valid = match labels.split_last() {
        Some((last, rest)) => TLD_RE.is_match(last) && rest.iter().all(|l| LABEL_RE.is_match(l)),
        None => false,
    };

    if !valid {
        return Err(DomainPriceError::invalid_domain(
            candidate,
            "Unrecognized TLD format",
        ));
    }

    Ok(tld)
}

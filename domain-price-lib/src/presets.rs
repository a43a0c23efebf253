//! Named TLD candidate lists for sweeps.

use std::collections::HashMap;

/// Candidates used when a sweep is given no explicit TLDs.
pub const DEFAULT_TLDS: &[&str] = &["com", "net", "org", "io", "eu"];

const CLASSIC_TLDS: &[&str] = &["com", "net", "org", "info", "biz"];
const STARTUP_TLDS: &[&str] = &["com", "io", "ai", "tech", "app", "dev", "xyz"];
const COUNTRY_TLDS: &[&str] = &["de", "fr", "nl", "uk", "eu", "us", "ca"];
const POPULAR_TLDS: &[&str] = &["com", "net", "org", "io", "co", "me", "app", "dev"];

/// Get the TLD list for a built-in preset.
///
/// Preset names are case-insensitive.
///
/// # Example
///
/// ```rust
/// use domain_price_lib::get_preset_tlds;
///
/// let startup_tlds = get_preset_tlds("startup").unwrap();
/// assert!(startup_tlds.contains(&"io".to_string()));
/// ```
pub fn get_preset_tlds(preset: &str) -> Option<Vec<String>> {
    let tlds = match preset.to_lowercase().as_str() {
        "default" => Some(DEFAULT_TLDS),
        "classic" => Some(CLASSIC_TLDS),
        "startup" => Some(STARTUP_TLDS),
        "country" => Some(COUNTRY_TLDS),
        "popular" => Some(POPULAR_TLDS),
        _ => None,
    };
    tlds.map(|v| v.iter().map(|s| s.to_string()).collect())
}

/// Resolve a preset, checking user-defined presets before built-in ones.
pub fn get_preset_tlds_with_custom(
    preset: &str,
    custom_presets: &HashMap<String, Vec<String>>,
) -> Option<Vec<String>> {
    let wanted = preset.to_lowercase();
    custom_presets
        .iter()
        .find(|(name, _)| name.to_lowercase() == wanted)
        .map(|(_, tlds)| tlds.clone())
        .or_else(|| get_preset_tlds(preset))
}

/// Names of all built-in presets, sorted.
pub fn get_available_presets() -> Vec<&'static str> {
    vec!["classic", "country", "default", "popular", "startup"]
}

//! Configuration file parsing and management.
//!
//! This module loads configuration from TOML files and environment variables
//! and resolves them, with proper precedence, into one [`PriceConfig`].
//! Registrar credentials are read from the environment only.

use crate::error::DomainPriceError;
use crate::presets::get_preset_tlds_with_custom;
use crate::types::PriceConfig;
use crate::utils::normalize_tld;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Lookup defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Reporting currency and conversion behaviour
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyConfig>,

    /// Per-registrar endpoint overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrars: Option<RegistrarsConfig>,

    /// User-defined TLD presets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_presets: Option<HashMap<String, Vec<String>>>,
}

/// Default values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Domains checked at once during a sweep
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Per-request timeout (e.g. "10s", "1m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Delay before retrying a transient failure (e.g. "250ms")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_backoff: Option<String>,

    /// Sweep TLD candidates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tlds: Option<Vec<String>>,

    /// Sweep TLD preset (alternative to `tlds`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
}

/// Currency conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CurrencyConfig {
    /// Reporting currency (e.g. "EUR")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Rate used when the exchange-rate service is unusable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_rate: Option<f64>,

    /// How long fetched rates are reused ("0" disables caching)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<String>,

    /// Exchange-rate service base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Endpoint overrides for each registrar backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RegistrarsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub godaddy: Option<EndpointConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gandi: Option<EndpointConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EndpointConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which config files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load and validate configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, DomainPriceError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DomainPriceError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DomainPriceError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is lowest, then the home directory, then the current
    /// directory. Files that fail to parse are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, DomainPriceError> {
        let mut merged_config = FileConfig::default();
        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    if self.verbose {
                        debug!(path = %path.display(), "Loaded config file");
                    }
                    merged_config = self.merge_configs(merged_config, config);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Ignoring config file"),
            }
        }

        Ok(merged_config)
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./domain-price.toml", "./.domain-price.toml"]
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".domain-price.toml", "domain-price.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|p| p.exists())
    }

    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-price").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations; values from `higher` win.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower_defaults), Some(higher_defaults)) => {
                    // a TLD list and a preset are alternatives; the higher file's choice wins
                    let higher_picks_preset = higher_defaults.preset.is_some();
                    let higher_picks_tlds = higher_defaults.tlds.is_some();

                    Some(DefaultsConfig {
                        concurrency: higher_defaults.concurrency.or(lower_defaults.concurrency),
                        timeout: higher_defaults.timeout.or(lower_defaults.timeout),
                        retry_backoff: higher_defaults
                            .retry_backoff
                            .or(lower_defaults.retry_backoff),
                        tlds: if higher_picks_preset {
                            higher_defaults.tlds
                        } else {
                            higher_defaults.tlds.or(lower_defaults.tlds)
                        },
                        preset: if higher_picks_tlds {
                            higher_defaults.preset
                        } else {
                            higher_defaults.preset.or(lower_defaults.preset)
                        },
                    })
                }
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            currency: match (lower.currency, higher.currency) {
                (Some(lower_currency), Some(higher_currency)) => Some(CurrencyConfig {
                    target: higher_currency.target.or(lower_currency.target),
                    fallback_rate: higher_currency.fallback_rate.or(lower_currency.fallback_rate),
                    cache_ttl: higher_currency.cache_ttl.or(lower_currency.cache_ttl),
                    base_url: higher_currency.base_url.or(lower_currency.base_url),
                }),
                (lower_currency, higher_currency) => higher_currency.or(lower_currency),
            },
            registrars: match (lower.registrars, higher.registrars) {
                (Some(lower_registrars), Some(higher_registrars)) => Some(RegistrarsConfig {
                    godaddy: higher_registrars.godaddy.or(lower_registrars.godaddy),
                    gandi: higher_registrars.gandi.or(lower_registrars.gandi),
                }),
                (lower_registrars, higher_registrars) => higher_registrars.or(lower_registrars),
            },
            custom_presets: match (lower.custom_presets, higher.custom_presets) {
                (Some(mut lower_presets), Some(higher_presets)) => {
                    lower_presets.extend(higher_presets);
                    Some(lower_presets)
                }
                (lower_presets, higher_presets) => higher_presets.or(lower_presets),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), DomainPriceError> {
        if let Some(defaults) = &config.defaults {
            if let Some(concurrency) = defaults.concurrency {
                if concurrency == 0 || concurrency > 32 {
                    return Err(DomainPriceError::config(
                        "Concurrency must be between 1 and 32",
                    ));
                }
            }

            for (name, value) in [
                ("timeout", &defaults.timeout),
                ("retry_backoff", &defaults.retry_backoff),
            ] {
                if let Some(value) = value {
                    if parse_duration_string(value).is_none() {
                        return Err(DomainPriceError::config(format!(
                            "Invalid {} '{}'. Use format like '250ms', '5s', '2m'",
                            name, value
                        )));
                    }
                }
            }

            if defaults.preset.is_some() && defaults.tlds.is_some() {
                return Err(DomainPriceError::config(
                    "Cannot specify both 'preset' and 'tlds' in defaults",
                ));
            }

            if let Some(tlds) = &defaults.tlds {
                validate_tld_list(tlds, "defaults.tlds")?;
            }
        }

        if let Some(currency) = &config.currency {
            if let Some(rate) = currency.fallback_rate {
                if !(rate.is_finite() && rate > 0.0) {
                    return Err(DomainPriceError::config(format!(
                        "Fallback rate must be positive, got {}",
                        rate
                    )));
                }
            }

            if let Some(target) = &currency.target {
                if !is_currency_code(target) {
                    return Err(DomainPriceError::config(format!(
                        "Invalid currency code '{}'",
                        target
                    )));
                }
            }

            if let Some(ttl) = &currency.cache_ttl {
                if parse_duration_string(ttl).is_none() {
                    return Err(DomainPriceError::config(format!(
                        "Invalid cache_ttl '{}'",
                        ttl
                    )));
                }
            }
        }

        if let Some(presets) = &config.custom_presets {
            for (name, tlds) in presets {
                if name.is_empty() {
                    return Err(DomainPriceError::config(
                        "Custom preset names cannot be empty",
                    ));
                }
                if tlds.is_empty() {
                    return Err(DomainPriceError::config(format!(
                        "Custom preset '{}' cannot have empty TLD list",
                        name
                    )));
                }
                validate_tld_list(tlds, &format!("preset '{}'", name))?;
            }
        }

        Ok(())
    }
}

fn validate_tld_list(tlds: &[String], context: &str) -> Result<(), DomainPriceError> {
    for tld in tlds {
        normalize_tld(tld).map_err(|_| {
            DomainPriceError::config(format!("Invalid TLD '{}' in {}", tld, context))
        })?;
    }
    Ok(())
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

/// Environment variable configuration.
///
/// Settings come from `DP_*` variables; credentials use the registrars' own
/// conventional names.
#[derive(Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub timeout: Option<Duration>,
    pub tlds: Option<Vec<String>>,
    pub preset: Option<String>,
    pub currency: Option<String>,
    pub fallback_rate: Option<f64>,
    pub config: Option<String>,
    pub godaddy_url: Option<String>,
    pub gandi_url: Option<String>,
    pub rates_url: Option<String>,
    pub godaddy_key: Option<String>,
    pub godaddy_secret: Option<String>,
    pub gandi_key: Option<String>,
    pub rates_key: Option<String>,
}

impl std::fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let present = |v: &Option<String>| v.is_some();
        f.debug_struct("EnvConfig")
            .field("concurrency", &self.concurrency)
            .field("timeout", &self.timeout)
            .field("tlds", &self.tlds)
            .field("preset", &self.preset)
            .field("currency", &self.currency)
            .field("fallback_rate", &self.fallback_rate)
            .field("config", &self.config)
            .field("godaddy_url", &self.godaddy_url)
            .field("gandi_url", &self.gandi_url)
            .field("rates_url", &self.rates_url)
            .field("godaddy_key_set", &present(&self.godaddy_key))
            .field("godaddy_secret_set", &present(&self.godaddy_secret))
            .field("gandi_key_set", &present(&self.gandi_key))
            .field("rates_key_set", &present(&self.rates_key))
            .finish()
    }
}

/// Load configuration from the process environment.
///
/// Invalid values are logged and ignored; missing credentials are not an
/// error.
pub fn load_env_config() -> EnvConfig {
    load_env_from(|name| env::var(name).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_env_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let mut env_config = EnvConfig::default();

    if let Some(val) = read("DP_CONCURRENCY") {
        match val.parse::<usize>() {
            Ok(concurrency) if (1..=32).contains(&concurrency) => {
                debug!(concurrency, "Using DP_CONCURRENCY");
                env_config.concurrency = Some(concurrency);
            }
            _ => warn!(value = %val, "Invalid DP_CONCURRENCY, must be 1-32"),
        }
    }

    if let Some(val) = read("DP_TIMEOUT") {
        match parse_duration_string(&val) {
            Some(timeout) => env_config.timeout = Some(timeout),
            None => warn!(value = %val, "Invalid DP_TIMEOUT, use format like '5s', '2m'"),
        }
    }

    if let Some(val) = read("DP_TLD") {
        let tlds: Vec<String> = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if tlds.iter().all(|t| normalize_tld(t).is_ok()) && !tlds.is_empty() {
            env_config.tlds = Some(tlds);
        } else {
            warn!(value = %val, "Invalid DP_TLD, expected comma-separated TLDs");
        }
    }

    env_config.preset = read("DP_PRESET");

    if let Some(val) = read("DP_CURRENCY") {
        if is_currency_code(&val) {
            env_config.currency = Some(val.to_uppercase());
        } else {
            warn!(value = %val, "Invalid DP_CURRENCY, expected a 3-letter code");
        }
    }

    if let Some(val) = read("DP_FALLBACK_RATE") {
        match val.parse::<f64>() {
            Ok(rate) if rate.is_finite() && rate > 0.0 => env_config.fallback_rate = Some(rate),
            _ => warn!(value = %val, "Invalid DP_FALLBACK_RATE, must be a positive number"),
        }
    }

    env_config.config = read("DP_CONFIG");
    env_config.godaddy_url = read("DP_GODADDY_URL");
    env_config.gandi_url = read("DP_GANDI_URL");
    env_config.rates_url = read("DP_RATES_URL");
    env_config.godaddy_key = read("GODADDY_API_KEY");
    env_config.godaddy_secret = read("GODADDY_API_SECRET");
    env_config.gandi_key = read("GANDI_API_KEY");
    env_config.rates_key = read("EXCHANGE_RATE_API_KEY");

    let godaddy_missing = env_config.godaddy_key.is_none() || env_config.godaddy_secret.is_none();
    for (name, missing) in [
        ("GODADDY_API_KEY/GODADDY_API_SECRET", godaddy_missing),
        ("GANDI_API_KEY", env_config.gandi_key.is_none()),
        ("EXCHANGE_RATE_API_KEY", env_config.rates_key.is_none()),
    ] {
        if missing {
            debug!(variable = name, "Credential not set");
        }
    }

    env_config
}

impl PriceConfig {
    /// Resolve defaults, then file values, then environment values.
    pub fn from_sources(file: &FileConfig, env: &EnvConfig) -> Result<Self, DomainPriceError> {
        let mut config = PriceConfig::default();

        if let Some(presets) = &file.custom_presets {
            config.custom_presets = presets.clone();
        }

        if let Some(defaults) = &file.defaults {
            if let Some(concurrency) = defaults.concurrency {
                config = config.with_concurrency(concurrency);
            }
            if let Some(timeout) = defaults.timeout.as_deref().and_then(parse_duration_string) {
                config.request_timeout = timeout;
            }
            if let Some(backoff) = defaults.retry_backoff.as_deref().and_then(parse_duration_string) {
                config.retry_backoff = backoff;
            }
            if let Some(tlds) = &defaults.tlds {
                config.default_tlds = tlds.clone();
            }
            if let Some(preset) = &defaults.preset {
                config.default_tlds = config.resolve_preset(preset)?;
            }
        }

        if let Some(currency) = &file.currency {
            if let Some(target) = &currency.target {
                config = config.with_target_currency(target.as_str());
            }
            if let Some(rate) = currency.fallback_rate {
                config.fallback_rate = rate;
            }
            if let Some(ttl) = currency.cache_ttl.as_deref().and_then(parse_duration_string) {
                config.rate_cache_ttl = (!ttl.is_zero()).then_some(ttl);
            }
            if let Some(url) = &currency.base_url {
                config.rates.base_url = url.clone();
            }
        }

        if let Some(registrars) = &file.registrars {
            if let Some(url) = registrars.godaddy.as_ref().and_then(|e| e.base_url.clone()) {
                config.godaddy.base_url = url;
            }
            if let Some(url) = registrars.gandi.as_ref().and_then(|e| e.base_url.clone()) {
                config.gandi.base_url = url;
            }
        }

        if let Some(concurrency) = env.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(timeout) = env.timeout {
            config.request_timeout = timeout;
        }
        if let Some(tlds) = &env.tlds {
            config.default_tlds = tlds.clone();
        } else if let Some(preset) = &env.preset {
            config.default_tlds = config.resolve_preset(preset)?;
        }
        if let Some(currency) = &env.currency {
            config = config.with_target_currency(currency.as_str());
        }
        if let Some(rate) = env.fallback_rate {
            config.fallback_rate = rate;
        }
        if let Some(url) = &env.godaddy_url {
            config.godaddy.base_url = url.clone();
        }
        if let Some(url) = &env.gandi_url {
            config.gandi.base_url = url.clone();
        }
        if let Some(url) = &env.rates_url {
            config.rates.base_url = url.clone();
        }

        config.godaddy.api_key = env.godaddy_key.clone();
        config.godaddy.api_secret = env.godaddy_secret.clone();
        config.gandi.api_key = env.gandi_key.clone();
        config.rates.api_key = env.rates_key.clone();

        Ok(config)
    }

    /// Look up a preset, user-defined ones first.
    pub fn resolve_preset(&self, preset: &str) -> Result<Vec<String>, DomainPriceError> {
        get_preset_tlds_with_custom(preset, &self.custom_presets)
            .ok_or_else(|| DomainPriceError::config(format!("Unknown preset '{}'", preset)))
    }
}

/// Parse a duration like "250ms", "5s", "2m", or bare seconds.
pub fn parse_duration_string(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    if let Some(ms) = value.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = value.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = value.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        value.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    fn env_from(pairs: &[(&str, &str)]) -> EnvConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_env_from(|name| map.get(name).cloned())
    }

    #[test]
    fn test_parse_duration_string() {
        assert_eq!(parse_duration_string("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration_string("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration_string("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration_string("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_duration_string("soon"), None);
    }

    #[test]
    fn test_parse_duration_rejects_overflowing_minutes() {
        assert_eq!(parse_duration_string("999999999999999999m"), None);
        assert_eq!(
            parse_duration_string("307445734561825860m"),
            Some(Duration::from_secs(307445734561825860 * 60))
        );
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(
            r#"
[defaults]
concurrency = 8
timeout = "3s"
preset = "shops"

[currency]
target = "usd"
fallback_rate = 1.08
cache_ttl = "0"

[registrars.gandi]
base_url = "http://localhost:9000"

[custom_presets]
shops = ["shop", ".store"]
"#,
        );

        let manager = ConfigManager::new(false);
        let file_config = manager.load_file(file.path()).unwrap();
        let config = PriceConfig::from_sources(&file_config, &EnvConfig::default()).unwrap();

        assert_eq!(config.concurrency, 8);
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.default_tlds, vec!["shop", ".store"]);
        assert_eq!(config.target_currency, "USD");
        assert_eq!(config.fallback_rate, 1.08);
        assert_eq!(config.rate_cache_ttl, None);
        assert_eq!(config.gandi.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_invalid_concurrency_rejected() {
        let file = write_config("[defaults]\nconcurrency = 0\n");
        assert!(ConfigManager::new(false).load_file(file.path()).is_err());
    }

    #[test]
    fn test_preset_and_tlds_conflict() {
        let file = write_config("[defaults]\npreset = \"classic\"\ntlds = [\"com\"]\n");
        let err = ConfigManager::new(false).load_file(file.path()).unwrap_err();
        assert!(matches!(err, DomainPriceError::ConfigError { .. }));
    }

    #[test]
    fn test_non_positive_fallback_rate_rejected() {
        let file = write_config("[currency]\nfallback_rate = 0.0\n");
        assert!(ConfigManager::new(false).load_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_file_error() {
        let err = ConfigManager::new(false)
            .load_file("/definitely/not/here.toml")
            .unwrap_err();
        assert!(matches!(err, DomainPriceError::FileError { .. }));
    }

    #[test]
    fn test_merge_configs_higher_wins() {
        let manager = ConfigManager::new(false);
        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(2),
                tlds: Some(vec!["com".to_string()]),
                timeout: Some("4s".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(6),
                preset: Some("startup".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let defaults = manager.merge_configs(lower, higher).defaults.unwrap();
        assert_eq!(defaults.concurrency, Some(6));
        assert_eq!(defaults.timeout, Some("4s".to_string()));
        assert_eq!(defaults.preset, Some("startup".to_string()));
        assert_eq!(defaults.tlds, None);
    }

    #[test]
    fn test_env_overrides_file_and_supplies_credentials() {
        let file_config = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(2),
                ..Default::default()
            }),
            ..Default::default()
        };
        let env = env_from(&[
            ("DP_CONCURRENCY", "12"),
            ("DP_TLD", "com, io"),
            ("DP_GODADDY_URL", "http://godaddy.test"),
            ("GODADDY_API_KEY", "key"),
            ("GODADDY_API_SECRET", "secret"),
            ("EXCHANGE_RATE_API_KEY", "rates"),
        ]);

        let config = PriceConfig::from_sources(&file_config, &env).unwrap();
        assert_eq!(config.concurrency, 12);
        assert_eq!(config.default_tlds, vec!["com", "io"]);
        assert_eq!(config.godaddy.base_url, "http://godaddy.test");
        assert_eq!(config.godaddy.api_key.as_deref(), Some("key"));
        assert_eq!(config.rates.api_key.as_deref(), Some("rates"));
        assert_eq!(config.gandi.api_key, None);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let env = env_from(&[
            ("DP_CONCURRENCY", "999"),
            ("DP_TIMEOUT", "later"),
            ("DP_FALLBACK_RATE", "-1"),
            ("DP_CURRENCY", "euro"),
        ]);
        assert_eq!(env, EnvConfig::default());
    }

    #[test]
    fn test_unknown_env_preset_is_config_error() {
        let env = env_from(&[("DP_PRESET", "imaginary")]);
        let err = PriceConfig::from_sources(&FileConfig::default(), &env).unwrap_err();
        assert!(matches!(err, DomainPriceError::ConfigError { .. }));
    }
}

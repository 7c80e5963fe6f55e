//! Lookup configuration
//!
//! Plain `KEY=value` text, one entry per line:
//!
//! ```text
//! # config.txt
//! STEAM_API_KEY=0123456789ABCDEF
//! API_RATE_LIMIT_PER_MINUTE=60
//! ```
//!
//! Every key is optional; missing or malformed values fall back to the
//! defaults below. The config is built once and handed to the sources by
//! reference.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Result;
use crate::net::RetryPolicy;

pub const DEFAULT_API_BASE_URL: &str = "https://api.steampowered.com";
pub const DEFAULT_STORE_API_BASE_URL: &str = "https://store.steampowered.com/api";
pub const DEFAULT_SCRAPE_BASE_URL: &str = "https://steamdb.info";
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 30;
pub const DEFAULT_USER_AGENT: &str = "SteamDB CLI/1.0";

/// Settings for the lookup pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct LookupConfig {
    /// Steam Web API base (credential check)
    pub api_base_url: String,

    /// Steam store API base (`/appdetails`)
    pub store_api_base_url: String,

    /// Steam Web API key; `None` disables the API source
    pub api_key: Option<String>,

    /// Request budget for the API source
    pub api_requests_per_minute: u32,

    /// SteamDB base URL (search + app pages)
    pub scrape_base_url: String,

    /// Request budget for the scrape source
    pub scrape_requests_per_minute: u32,

    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_multiplier: f64,

    /// Transport timeout per request, the only hard stop on a fetch
    pub request_timeout_secs: u64,

    pub user_agent: String,

    /// Scrape even when the API reports "not found"
    pub fallback_on_api_not_found: bool,

    /// Deduplicate concurrent lookups of the same key
    pub single_flight: bool,

    /// Unrecognized keys, kept for collaborators
    pub extra: HashMap<String, String>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            store_api_base_url: DEFAULT_STORE_API_BASE_URL.to_string(),
            api_key: None,
            api_requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            scrape_base_url: DEFAULT_SCRAPE_BASE_URL.to_string(),
            scrape_requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            retry_max_attempts: 3,
            retry_base_delay_ms: 2000,
            retry_multiplier: 2.0,
            request_timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fallback_on_api_not_found: false,
            single_flight: true,
            extra: HashMap::new(),
        }
    }
}

impl LookupConfig {
    /// Load a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!("Loaded config from {}", path.as_ref().display());
        Ok(Self::parse(&text))
    }

    /// Parse `KEY=value` lines. Lines without `=` and `#` comments are skipped.
    pub fn parse(text: &str) -> Self {
        let map: HashMap<String, String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();

        Self::from_map(&map)
    }

    /// Build from already-split key/value pairs, with defaults for anything missing.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        let mut extra = HashMap::new();

        for (key, value) in map {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                extra.insert(key.clone(), value.clone());
            }
        }

        let string = |key: &str, default: String| {
            map.get(key)
                .filter(|v| !v.is_empty())
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(default)
        };

        Self {
            api_base_url: string("STEAM_API_BASE_URL", defaults.api_base_url),
            store_api_base_url: string("STEAM_STORE_API_BASE_URL", defaults.store_api_base_url),
            api_key: map
                .get("STEAM_API_KEY")
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            api_requests_per_minute: parse_or(
                map,
                "API_RATE_LIMIT_PER_MINUTE",
                defaults.api_requests_per_minute,
            ),
            scrape_base_url: string("SCRAPE_BASE_URL", defaults.scrape_base_url),
            scrape_requests_per_minute: parse_or(
                map,
                "SCRAPE_RATE_LIMIT_PER_MINUTE",
                defaults.scrape_requests_per_minute,
            ),
            retry_max_attempts: parse_or(map, "RETRY_MAX_ATTEMPTS", defaults.retry_max_attempts),
            retry_base_delay_ms: parse_or(map, "RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms),
            retry_multiplier: parse_multiplier(map, defaults.retry_multiplier),
            request_timeout_secs: parse_or(map, "REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            user_agent: map
                .get("USER_AGENT")
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or(defaults.user_agent),
            fallback_on_api_not_found: parse_or(
                map,
                "FALLBACK_ON_API_NOT_FOUND",
                defaults.fallback_on_api_not_found,
            ),
            single_flight: parse_or(map, "SINGLE_FLIGHT", defaults.single_flight),
            extra,
        }
    }

    /// Set the API credential (e.g. from an environment variable)
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.api_key = if key.trim().is_empty() { None } else { Some(key.trim().to_string()) };
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Retry policy shared by both sources' fetchers
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts.max(1),
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            multiplier: if self.retry_multiplier >= 1.0 { self.retry_multiplier } else { 1.0 },
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

const KNOWN_KEYS: &[&str] = &[
    "STEAM_API_BASE_URL",
    "STEAM_STORE_API_BASE_URL",
    "STEAM_API_KEY",
    "API_RATE_LIMIT_PER_MINUTE",
    "SCRAPE_BASE_URL",
    "SCRAPE_RATE_LIMIT_PER_MINUTE",
    "RETRY_MAX_ATTEMPTS",
    "RETRY_BASE_DELAY_MS",
    "RETRY_MULTIPLIER",
    "REQUEST_TIMEOUT_SECS",
    "USER_AGENT",
    "FALLBACK_ON_API_NOT_FOUND",
    "SINGLE_FLIGHT",
];

fn parse_or<T: FromStr + Copy>(map: &HashMap<String, String>, key: &str, default: T) -> T {
    match map.get(key) {
        None => default,
        Some(raw) => match raw.trim().to_ascii_lowercase().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("⚠️ Ignoring malformed config value {}={:?}", key, raw);
                default
            }
        },
    }
}

/// Largest accepted `RETRY_MULTIPLIER`
pub const MAX_RETRY_MULTIPLIER: f64 = 10.0;

fn parse_multiplier(map: &HashMap<String, String>, default: f64) -> f64 {
    let value = parse_or(map, "RETRY_MULTIPLIER", default);
    if value.is_finite() && value <= MAX_RETRY_MULTIPLIER {
        value
    } else {
        tracing::warn!(
            "⚠️ RETRY_MULTIPLIER={} is out of range (max {}), using {}",
            value,
            MAX_RETRY_MULTIPLIER,
            default
        );
        default
    }
}

impl fmt::Display for LookupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "api={} (key {}), store={}, scrape={}, rpm api/scrape={}/{}, retries={}x{}ms*{}, timeout={}s",
            self.api_base_url,
            if self.has_api_key() { "set" } else { "unset" },
            self.store_api_base_url,
            self.scrape_base_url,
            self.api_requests_per_minute,
            self.scrape_requests_per_minute,
            self.retry_max_attempts,
            self.retry_base_delay_ms,
            self.retry_multiplier,
            self.request_timeout_secs,
        )
    }
}

//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use catalog::{BreakerConfig, ResilienceConfig, RetryPolicy};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL URL; unset keeps all state in memory
/// - `CATALOG_URL`: catalog base URL (default: `"http://localhost:8081"`)
/// - `CATALOG_API_KEY`: sent as `X-API-KEY`; empty omits the header
/// - `CATALOG_TIMEOUT_MS`: per-attempt timeout (default: `2000`)
/// - `CATALOG_RETRY_ATTEMPTS`: attempts per lookup (default: `3`)
/// - `CATALOG_RETRY_WAIT_MS`: pause between attempts (default: `1000`)
/// - `BREAKER_WINDOW_SIZE`: calls in the failure window (default: `5`)
/// - `BREAKER_FAILURE_RATE`: opening threshold in percent (default: `50`)
/// - `BREAKER_OPEN_MS`: open-state cooldown (default: `10000`)
///
/// Unparseable numbers fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub catalog_url: String,
    pub catalog_api_key: Option<String>,
    pub catalog_timeout: Duration,
    pub retry_attempts: u32,
    pub retry_wait: Duration,
    pub breaker_window_size: usize,
    pub breaker_failure_rate: f64,
    pub breaker_open: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let parsed = |name: &str| non_empty(name).and_then(|v| v.trim().parse().ok());
        let millis = |name: &str, fallback: Duration| {
            parsed(name).map(Duration::from_millis).unwrap_or(fallback)
        };

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: non_empty("DATABASE_URL"),
            catalog_url: non_empty("CATALOG_URL").unwrap_or(defaults.catalog_url),
            catalog_api_key: non_empty("CATALOG_API_KEY"),
            catalog_timeout: millis("CATALOG_TIMEOUT_MS", defaults.catalog_timeout),
            retry_attempts: parse_or(&lookup, "CATALOG_RETRY_ATTEMPTS", defaults.retry_attempts)
                .max(1),
            retry_wait: millis("CATALOG_RETRY_WAIT_MS", defaults.retry_wait),
            breaker_window_size: parse_or(
                &lookup,
                "BREAKER_WINDOW_SIZE",
                defaults.breaker_window_size,
            )
            .max(1),
            breaker_failure_rate: parse_or(
                &lookup,
                "BREAKER_FAILURE_RATE",
                defaults.breaker_failure_rate,
            )
            .clamp(0.0, 100.0),
            breaker_open: millis("BREAKER_OPEN_MS", defaults.breaker_open),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds the catalog client's retry and breaker settings.
    pub fn resilience(&self) -> ResilienceConfig {
        ResilienceConfig {
            retry: RetryPolicy::fixed(self.retry_attempts, self.retry_wait),
            breaker: BreakerConfig {
                window_size: self.breaker_window_size,
                failure_rate_threshold: self.breaker_failure_rate,
                open_cooldown: self.breaker_open,
                ..BreakerConfig::default()
            },
            attempt_timeout: Some(self.catalog_timeout),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, fallback: T) -> T {
    lookup(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(fallback)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            catalog_url: "http://localhost:8081".to_string(),
            catalog_api_key: None,
            catalog_timeout: Duration::from_millis(2000),
            retry_attempts: 3,
            retry_wait: Duration::from_millis(1000),
            breaker_window_size: 5,
            breaker_failure_rate: 50.0,
            breaker_open: Duration::from_millis(10_000),
        }
    }
}

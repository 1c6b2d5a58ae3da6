//! Per-source runtime configuration.

use std::time::Duration;

use crate::breaker::BreakerConfig;

/// Settings for one source adapter: endpoints, HTTP client tuning,
/// pacing and resilience knobs.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// List endpoint the search query parameters are appended to
    pub base_url: String,
    /// Endpoint probed by the health supervisor
    pub health_endpoint: String,
    /// API key for sources that require one
    pub api_key: Option<String>,
    /// Whole-request timeout
    pub timeout: Duration,
    /// Interval between outbound calls (rate limiter)
    pub rate_interval: Duration,
    /// In-flight request ceiling (semaphore size)
    pub max_concurrent: usize,
    /// Per-source circuit breaker tuning
    pub breaker: BreakerConfig,
    /// Keep-alive connections retained per host
    pub max_idle_per_host: usize,
    /// How long an idle connection is kept before closing
    pub idle_timeout: Duration,
    /// TCP connect ceiling (covers the TLS handshake as well)
    pub connect_timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            health_endpoint: String::new(),
            api_key: None,
            timeout: Duration::from_secs(30),
            rate_interval: Duration::from_secs(2),
            max_concurrent: 10,
            breaker: BreakerConfig::default(),
            max_idle_per_host: 5,
            idle_timeout: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl SourceConfig {
    /// Defaults pointing at the given endpoints.
    pub fn for_endpoints(base_url: impl Into<String>, health_endpoint: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            health_endpoint: health_endpoint.into(),
            ..Self::default()
        }
    }
}

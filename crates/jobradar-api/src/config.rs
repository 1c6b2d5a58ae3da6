//! Service configuration.
//!
//! The HTTP-facing knobs come from environment variables; component
//! tuning (caches, sources, manager, health checks) comes from YAML
//! files whose paths are also environment-provided. An absent file
//! falls back to built-in defaults, unknown keys are tolerated, and a
//! file that exists but does not parse is a startup failure.

use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::info;

use jobradar_manager::{HealthCheckConfig, ManagerConfig};
use jobradar_sources::{BreakerConfig, SourceConfig};

/// HTTP server configuration, environment-driven.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,
    /// Ceiling on one concurrent fan-out, seconds (CONC_SEARCH_TIMEOUT)
    pub conc_search_timeout: Duration,
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            conc_search_timeout: Duration::from_secs(10),
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            conc_search_timeout: Duration::from_secs(
                std::env::var("CONC_SEARCH_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

/// Load a YAML config from the path named by `env_var`.
///
/// Unset variable or missing file means defaults; a file that fails to
/// parse is an error the caller treats as fatal.
pub fn load_yaml_config<T: DeserializeOwned + Default>(env_var: &str) -> Result<T, String> {
    let Some(path) = std::env::var(env_var).ok().filter(|p| !p.is_empty()) else {
        return Ok(T::default());
    };

    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(_) => {
            info!(path = %path, "config file absent, using defaults");
            return Ok(T::default());
        }
    };

    serde_yaml::from_str(&text).map_err(|err| format!("failed to parse {path}: {err}"))
}

// --- YAML-facing structs --------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSectionYaml {
    pub ttl_secs: u64,
    pub cleanup_secs: u64,
}

impl Default for CacheSectionYaml {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            cleanup_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CachesYaml {
    pub num_shards: usize,
    pub search: CacheSectionYaml,
    pub index: CacheSectionYaml,
    pub details: CacheSectionYaml,
}

impl Default for CachesYaml {
    fn default() -> Self {
        Self {
            num_shards: 7,
            search: CacheSectionYaml::default(),
            index: CacheSectionYaml::default(),
            details: CacheSectionYaml::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerYaml {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub half_open_max_requests: u32,
    pub reset_timeout_secs: u64,
    pub window_secs: u64,
}

impl Default for BreakerYaml {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            half_open_max_requests: 2,
            reset_timeout_secs: 10,
            window_secs: 10,
        }
    }
}

impl From<BreakerYaml> for BreakerConfig {
    fn from(yaml: BreakerYaml) -> Self {
        BreakerConfig {
            failure_threshold: yaml.failure_threshold,
            success_threshold: yaml.success_threshold,
            half_open_max_requests: yaml.half_open_max_requests,
            reset_timeout: Duration::from_secs(yaml.reset_timeout_secs),
            window: Duration::from_secs(yaml.window_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceYaml {
    pub enabled: bool,
    pub base_url: String,
    pub health_endpoint: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub rate_interval_ms: u64,
    pub max_concurrent: usize,
    pub circuit_breaker: BreakerYaml,
    pub max_idle_conns: usize,
    pub idle_conn_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for SourceYaml {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: String::new(),
            health_endpoint: String::new(),
            api_key: None,
            timeout_secs: 30,
            rate_interval_ms: 2000,
            max_concurrent: 10,
            circuit_breaker: BreakerYaml::default(),
            max_idle_conns: 5,
            idle_conn_timeout_secs: 90,
            connect_timeout_secs: 10,
        }
    }
}

impl SourceYaml {
    /// Merge YAML values over a source's built-in defaults: endpoints are
    /// only overridden when the file sets them.
    pub fn apply_to(&self, mut base: SourceConfig) -> SourceConfig {
        if !self.base_url.is_empty() {
            base.base_url = self.base_url.clone();
        }
        if !self.health_endpoint.is_empty() {
            base.health_endpoint = self.health_endpoint.clone();
        }
        base.api_key = self.api_key.clone().or(base.api_key);
        base.timeout = Duration::from_secs(self.timeout_secs);
        base.rate_interval = Duration::from_millis(self.rate_interval_ms);
        base.max_concurrent = self.max_concurrent;
        base.breaker = self.circuit_breaker.clone().into();
        base.max_idle_per_host = self.max_idle_conns;
        base.idle_timeout = Duration::from_secs(self.idle_conn_timeout_secs);
        base.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        base
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesYaml {
    pub hh: SourceYaml,
    pub superjob: SourceYaml,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerYaml {
    pub circuit_breaker: BreakerYaml,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckYaml {
    pub request_timeout_secs: u64,
    pub check_interval_secs: u64,
    pub max_idle_conns: usize,
    pub connect_timeout_secs: u64,
}

impl Default for HealthCheckYaml {
    fn default() -> Self {
        Self {
            request_timeout_secs: 5,
            check_interval_secs: 15,
            max_idle_conns: 2,
            connect_timeout_secs: 3,
        }
    }
}

impl From<HealthCheckYaml> for HealthCheckConfig {
    fn from(yaml: HealthCheckYaml) -> Self {
        HealthCheckConfig {
            request_timeout: Duration::from_secs(yaml.request_timeout_secs),
            check_interval: Duration::from_secs(yaml.check_interval_secs),
            max_idle_per_host: yaml.max_idle_conns,
            connect_timeout: Duration::from_secs(yaml.connect_timeout_secs),
        }
    }
}

/// Build the manager tuning out of the YAML pieces and the fan-out
/// timeout from the environment.
pub fn manager_config(
    api: &ApiConfig,
    caches: &CachesYaml,
    manager: &ManagerYaml,
) -> ManagerConfig {
    ManagerConfig {
        breaker: manager.circuit_breaker.clone().into(),
        fanout_timeout: api.conc_search_timeout,
        cache_shards: caches.num_shards,
        search_ttl: Duration::from_secs(caches.search.ttl_secs),
        search_cleanup: Duration::from_secs(caches.search.cleanup_secs),
        index_ttl: Duration::from_secs(caches.index.ttl_secs),
        index_cleanup: Duration::from_secs(caches.index.cleanup_secs),
        details_ttl: Duration::from_secs(caches.details.ttl_secs),
        details_cleanup: Duration::from_secs(caches.details.cleanup_secs),
        sizing: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_defaults_round_out_missing_sections() {
        let yaml = "num_shards: 5\nsearch:\n  ttl_secs: 120\n";
        let parsed: CachesYaml = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.num_shards, 5);
        assert_eq!(parsed.search.ttl_secs, 120);
        // Untouched sections keep their defaults.
        assert_eq!(parsed.index.ttl_secs, 60);
        assert_eq!(parsed.details.cleanup_secs, 30);
    }

    #[test]
    fn unknown_yaml_keys_are_tolerated() {
        let yaml = "num_shards: 3\nsome_future_knob: true\n";
        let parsed: CachesYaml = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.num_shards, 3);
    }

    #[test]
    fn source_yaml_overlays_endpoint_defaults() {
        let base = SourceConfig::for_endpoints("https://api.example/v", "https://api.example/v");
        let yaml = SourceYaml {
            rate_interval_ms: 250,
            ..Default::default()
        };
        let merged = yaml.apply_to(base);
        // Unset endpoints keep the adapter defaults.
        assert_eq!(merged.base_url, "https://api.example/v");
        assert_eq!(merged.rate_interval, Duration::from_millis(250));
    }
}

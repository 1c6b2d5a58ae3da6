//! Shared HTTP execution template for source adapters.
//!
//! Every outbound call runs the same gauntlet: circuit breaker, then the
//! per-source in-flight semaphore (bounded wait), then the rate limiter,
//! then the HTTP GET with status checking and JSON decoding. Concrete
//! sources plug in URL building and payload conversion on top.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::debug;
use url::Url;

use crate::breaker::{BreakerError, BreakerState, CircuitBreaker};
use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::rate_limiter::IntervalLimiter;

/// How long a call waits for an in-flight slot before giving up.
const SLOT_WAIT: Duration = Duration::from_secs(2);
/// Largest error-body excerpt read back for diagnostics.
const MAX_BODY_EXCERPT: usize = 1 << 20;
/// Portion of the excerpt surfaced in error messages.
const ERROR_EXCERPT: usize = 512;

/// HTTP client plus the resilience stack of one source.
pub struct SourceClient {
    name: String,
    base_url: String,
    health_endpoint: String,
    api_key: Option<String>,
    http: reqwest::Client,
    limiter: IntervalLimiter,
    breaker: CircuitBreaker,
    slots: Arc<Semaphore>,
}

impl SourceClient {
    pub fn new(name: impl Into<String>, config: SourceConfig) -> Result<Self, SourceError> {
        let limiter = IntervalLimiter::new(config.rate_interval)
            .map_err(|_| SourceError::InvalidRateInterval)?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(config.idle_timeout)
            .build()?;

        Ok(Self {
            name: name.into(),
            base_url: config.base_url,
            health_endpoint: config.health_endpoint,
            api_key: config.api_key,
            http,
            limiter,
            breaker: CircuitBreaker::new(config.breaker),
            slots: Arc::new(Semaphore::new(config.max_concurrent)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health_endpoint(&self) -> &str {
        &self.health_endpoint
    }

    /// Current breaker state tag, reported to the health supervisor.
    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }

    /// Parse the configured base url.
    pub fn parse_base_url(&self) -> Result<Url, SourceError> {
        Ok(Url::parse(&self.base_url)?)
    }

    /// Details endpoint: the vacancy id appended to the base path.
    pub fn detail_url(&self, vacancy_id: &str) -> Result<Url, SourceError> {
        let joined = format!("{}/{}", self.base_url.trim_end_matches('/'), vacancy_id);
        Ok(Url::parse(&joined)?)
    }

    /// Execute a GET under the full template and decode the JSON payload.
    pub async fn get_json<P: DeserializeOwned>(&self, url: Url) -> Result<P, SourceError> {
        let outcome = self.breaker.execute(|| self.guarded_get(url)).await;

        match outcome {
            Ok(payload) => Ok(payload),
            Err(BreakerError::Open) => {
                let (total, successes, failures) = self.breaker.stats();
                debug!(
                    source = %self.name,
                    total, successes, failures,
                    "circuit breaker open"
                );
                Err(SourceError::Unavailable {
                    name: self.name.clone(),
                })
            }
            Err(BreakerError::Throttled) => Err(SourceError::Throttled {
                name: self.name.clone(),
            }),
            Err(BreakerError::Service(err)) => Err(err),
        }
    }

    /// Stop the rate limiter; in-flight calls finish, new ones fail fast.
    pub fn stop(&self) {
        self.limiter.stop();
    }

    async fn guarded_get<P: DeserializeOwned>(&self, url: Url) -> Result<P, SourceError> {
        let _slot = self.acquire_slot().await?;
        self.pace().await?;

        debug!(source = %self.name, url = %url, "outbound request");

        let mut request = self.http.get(url);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-App-Id", key);
        }
        let response = request.send().await?;

        let status = response.status();
        // Bounded read on every path: the body is consumed up to the cap
        // and the connection returned to the pool.
        let body = read_limited(response).await?;

        if !status.is_success() {
            let excerpt = String::from_utf8_lossy(&body[..body.len().min(ERROR_EXCERPT)]).into_owned();
            if status.is_server_error() {
                return Err(SourceError::UpstreamServer {
                    status: status.as_u16(),
                    body: excerpt,
                });
            }
            return Err(SourceError::UnexpectedStatus {
                status: status.as_u16(),
                body: excerpt,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }

    async fn acquire_slot(&self) -> Result<tokio::sync::OwnedSemaphorePermit, SourceError> {
        match tokio::time::timeout(SLOT_WAIT, Arc::clone(&self.slots).acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            // The semaphore is never closed, so an acquire error cannot
            // happen outside of shutdown; report busy either way.
            _ => Err(SourceError::Busy {
                name: self.name.clone(),
            }),
        }
    }

    async fn pace(&self) -> Result<(), SourceError> {
        self.limiter.acquire().await.map_err(SourceError::RateLimiter)
    }
}

async fn read_limited(mut response: reqwest::Response) -> Result<Vec<u8>, SourceError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > MAX_BODY_EXCERPT {
            let keep = MAX_BODY_EXCERPT - body.len();
            body.extend_from_slice(&chunk[..keep]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

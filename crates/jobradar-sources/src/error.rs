//! Source error taxonomy.
//!
//! Variants are the contract with the manager's result policy: breaker
//! rejections, capacity refusals, upstream failures and semantic
//! mismatches are distinguished by variant rather than message text.

use thiserror::Error;

use crate::rate_limiter::RateLimitError;

#[derive(Debug, Error)]
pub enum SourceError {
    /// The source's circuit breaker is open.
    #[error("{name} is temporarily unavailable (circuit breaker open)")]
    Unavailable { name: String },

    /// The breaker is recovering and has no probe slots left.
    #[error("{name} rejected the call: too many requests while recovering")]
    Throttled { name: String },

    /// The per-source in-flight semaphore could not be acquired in time.
    #[error("{name} API is busy")]
    Busy { name: String },

    #[error(transparent)]
    RateLimiter(#[from] RateLimitError),

    /// Upstream answered with a 5xx status.
    #[error("upstream server error {status}: {body}")]
    UpstreamServer { status: u16, body: String },

    /// Upstream answered with an unexpected non-2xx status.
    #[error("API returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("decode response failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The source matched vacancies but returned none of them; the
    /// query text is too vague for its ranking to commit to results.
    #[error("query matched results but returned none, refine the search text")]
    RefineQuery,

    #[error("rate interval must be greater than zero")]
    InvalidRateInterval,
}

impl SourceError {
    /// True for rejections produced by a circuit breaker rather than by
    /// the upstream call itself.
    pub fn is_breaker_rejection(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Throttled { .. })
    }
}

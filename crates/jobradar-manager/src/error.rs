//! Manager error taxonomy.

use thiserror::Error;

use jobradar_sources::SourceError;

#[derive(Debug, Error)]
pub enum ManagerError {
    /// The job queue stayed full (or closed) for the whole enqueue window.
    #[error("job was not accepted by the queue")]
    QueueFull,

    /// The caller's wait on the job result hit its ceiling.
    #[error("timed out waiting for the job result")]
    WaitTimeout,

    /// The worker dropped the completion channel without answering.
    #[error("job result channel closed")]
    ResultChannelClosed,

    /// No free slot on the global semaphore within the slot-wait window.
    #[error("timed out waiting for a free manager slot")]
    SlotTimeout,

    /// The manager has no sources to fan out to.
    #[error("no sources available for search")]
    NoSources,

    /// The global circuit breaker rejected the call outright.
    #[error("search is temporarily unavailable (circuit breaker open)")]
    CircuitOpen,

    /// The global circuit breaker is recovering and out of probe slots.
    #[error("search rejected: too many requests while recovering")]
    Throttled,

    /// Every source failed; `breaker_origin` marks rejection-by-breaker
    /// failures so callers can distinguish "upstream broken" from a
    /// genuine failed call.
    #[error("all sources failed: {summary}")]
    AllSourcesFailed { summary: String, breaker_origin: bool },

    /// The health supervisor does not report the source healthy.
    #[error("source {name} is not reported healthy")]
    SourceUnhealthy { name: String },

    #[error("unknown source {name}")]
    UnknownSource { name: String },

    /// A worker recovered a panic while processing the job.
    #[error("job processing panicked: {0}")]
    JobPanicked(String),

    #[error("invalid manager configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl ManagerError {
    /// True when the error originates in a circuit breaker (global or
    /// per-source) rather than in the upstream call itself.
    pub fn is_breaker_origin(&self) -> bool {
        match self {
            Self::CircuitOpen | Self::Throttled => true,
            Self::AllSourcesFailed { breaker_origin, .. } => *breaker_origin,
            Self::Source(err) => err.is_breaker_rejection(),
            _ => false,
        }
    }
}

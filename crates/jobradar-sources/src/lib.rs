//! Source adapters for external job-board APIs.
//!
//! This crate provides:
//! - An interval-based rate limiter pacing outbound calls per source
//! - A three-state circuit breaker used per-source and by the manager
//! - A shared HTTP execution template (`SourceClient`) wrapping pacing,
//!   circuit breaking and an in-flight semaphore around every call
//! - Concrete adapters for HeadHunter and SuperJob

pub mod adapter;
pub mod breaker;
pub mod client;
pub mod config;
pub mod error;
pub mod hh;
pub mod rate_limiter;
pub mod superjob;

pub use adapter::SourceAdapter;
pub use breaker::{BreakerConfig, BreakerError, BreakerState, CircuitBreaker};
pub use client::SourceClient;
pub use config::SourceConfig;
pub use error::SourceError;
pub use hh::HhSource;
pub use rate_limiter::{IntervalLimiter, RateLimitError};
pub use superjob::SuperJobSource;

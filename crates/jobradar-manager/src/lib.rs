//! Parser manager and its supporting subsystems.
//!
//! The manager owns the source adapters, three TTL caches (search
//! results, reverse index, vacancy details), a global circuit breaker,
//! a global semaphore, a bounded job queue and a pool of workers. The
//! health supervisor keeps an authoritative liveness map over all
//! sources and feeds source selection for every fan-out.

pub mod config;
pub mod error;
pub mod health;
pub mod jobs;
pub mod manager;
mod search;
mod worker;

pub use config::{ManagerConfig, PoolSizing};
pub use error::ManagerError;
pub use health::{HealthCheckConfig, HealthSupervisor, SourceStatus};
pub use jobs::{SearchOutcome, SearchWarning};
pub use manager::ParserManager;

//! Manager configuration and load sizing.

use std::time::Duration;

use jobradar_sources::BreakerConfig;

/// Worker/queue/semaphore sizing for the manager's load-control system.
#[derive(Debug, Clone, Copy)]
pub struct PoolSizing {
    /// Number of queue workers
    pub workers: usize,
    /// Global semaphore capacity
    pub semaphore: usize,
    /// Job queue capacity
    pub queue: usize,
    /// How long a worker waits for a free semaphore slot
    pub slot_wait: Duration,
}

impl PoolSizing {
    /// Derive sizing from the available CPU count: workers are twice the
    /// cores, the semaphore admits ~70% of the workers and the queue
    /// holds three semaphores worth of jobs.
    pub fn for_cpus(cpus: usize) -> Self {
        let workers = cpus.max(1) * 2;
        let semaphore = ((workers as f64) * 0.7).ceil() as usize;
        let queue = semaphore * 3;

        Self {
            workers,
            semaphore,
            queue,
            slot_wait: Duration::from_millis(200),
        }
    }

    /// Sizing for the machine this process runs on.
    pub fn detect() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::for_cpus(cpus)
    }
}

/// Tuning for the parser manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Global circuit breaker guarding the fan-out path
    pub breaker: BreakerConfig,
    /// Ceiling on one concurrent fan-out (CONC_SEARCH_TIMEOUT)
    pub fanout_timeout: Duration,
    /// Shard count shared by the three caches
    pub cache_shards: usize,
    pub search_ttl: Duration,
    pub search_cleanup: Duration,
    pub index_ttl: Duration,
    pub index_cleanup: Duration,
    pub details_ttl: Duration,
    pub details_cleanup: Duration,
    /// Explicit sizing override; `None` derives from the CPU count
    pub sizing: Option<PoolSizing>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            breaker: BreakerConfig::default(),
            fanout_timeout: Duration::from_secs(10),
            cache_shards: jobradar_cache::DEFAULT_SHARDS,
            search_ttl: Duration::from_secs(60),
            search_cleanup: Duration::from_secs(30),
            index_ttl: Duration::from_secs(60),
            index_cleanup: Duration::from_secs(30),
            details_ttl: Duration::from_secs(60),
            details_cleanup: Duration::from_secs(30),
            sizing: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizing_follows_the_cpu_count() {
        let sizing = PoolSizing::for_cpus(4);
        assert_eq!(sizing.workers, 8);
        // ceil(0.7 * 8) = 6
        assert_eq!(sizing.semaphore, 6);
        assert_eq!(sizing.queue, 18);
        assert_eq!(sizing.slot_wait, Duration::from_millis(200));
    }

    #[test]
    fn sizing_never_drops_to_zero_workers() {
        let sizing = PoolSizing::for_cpus(0);
        assert_eq!(sizing.workers, 2);
        assert!(sizing.semaphore >= 1);
    }
}

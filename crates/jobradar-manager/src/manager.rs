//! The parser manager: job submission, load control and shutdown.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{oneshot, watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use jobradar_cache::ShardedCache;
use jobradar_models::{SearchParams, SourceResult, VacancyDetails, VacancyIndexEntry};
use jobradar_queue::FifoQueue;
use jobradar_sources::{CircuitBreaker, SourceAdapter};

use crate::config::{ManagerConfig, PoolSizing};
use crate::error::ManagerError;
use crate::health::HealthSupervisor;
use crate::jobs::{FetchDetailsJob, Job, SearchJob, SearchOutcome};

/// Ceiling on one enqueue attempt, retries included.
const ENQUEUE_WINDOW: Duration = Duration::from_secs(5);
/// Pause between enqueue retries.
const ENQUEUE_RETRY_PAUSE: Duration = Duration::from_millis(50);
/// Ceiling on waiting for a job's completion.
const RESULT_WAIT: Duration = Duration::from_secs(30);
/// Ceiling on graceful shutdown.
const SHUTDOWN_WINDOW: Duration = Duration::from_secs(10);

/// Orchestrates the source adapters behind a bounded queue and worker
/// pool, with a global circuit breaker and semaphore on the fan-out
/// path and three TTL caches for results, the reverse index and
/// vacancy details.
pub struct ParserManager {
    pub(crate) sources: Vec<Arc<dyn SourceAdapter>>,
    pub(crate) health: Arc<HealthSupervisor>,
    pub(crate) search_cache: ShardedCache<Vec<SourceResult>>,
    pub(crate) index_cache: ShardedCache<VacancyIndexEntry>,
    pub(crate) details_cache: ShardedCache<VacancyDetails>,
    pub(crate) breaker: CircuitBreaker,
    pub(crate) slots: Arc<Semaphore>,
    pub(crate) queue: FifoQueue<Job>,
    pub(crate) config: ManagerConfig,
    pub(crate) sizing: PoolSizing,
    stop: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ParserManager {
    /// Build the manager and start its workers.
    pub fn new(
        config: ManagerConfig,
        health: Arc<HealthSupervisor>,
        sources: Vec<Arc<dyn SourceAdapter>>,
    ) -> Result<Arc<Self>, ManagerError> {
        if sources.is_empty() {
            return Err(ManagerError::NoSources);
        }

        let sizing = config.sizing.unwrap_or_else(PoolSizing::detect);

        let search_cache = ShardedCache::new(config.cache_shards, config.search_cleanup)
            .map_err(|err| ManagerError::Config(err.to_string()))?;
        let index_cache = ShardedCache::new(config.cache_shards, config.index_cleanup)
            .map_err(|err| ManagerError::Config(err.to_string()))?;
        let details_cache = ShardedCache::new(config.cache_shards, config.details_cleanup)
            .map_err(|err| ManagerError::Config(err.to_string()))?;

        let (stop, _) = watch::channel(false);

        let manager = Arc::new(Self {
            sources,
            health,
            search_cache,
            index_cache,
            details_cache,
            breaker: CircuitBreaker::new(config.breaker),
            slots: Arc::new(Semaphore::new(sizing.semaphore)),
            queue: FifoQueue::new(sizing.queue),
            config,
            sizing,
            stop,
            workers: Mutex::new(Vec::new()),
        });

        manager.spawn_workers();

        info!(
            workers = manager.sizing.workers,
            semaphore = manager.sizing.semaphore,
            queue = manager.sizing.queue,
            "parser manager started"
        );

        Ok(manager)
    }

    /// Names of every configured source.
    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// The search-results cache, keyed by search fingerprint.
    pub fn search_cache(&self) -> &ShardedCache<Vec<SourceResult>> {
        &self.search_cache
    }

    /// The reverse-index cache, keyed by `{source}_{vacancy_id}`.
    pub fn index_cache(&self) -> &ShardedCache<VacancyIndexEntry> {
        &self.index_cache
    }

    /// The vacancy-details cache, keyed by vacancy id.
    pub fn details_cache(&self) -> &ShardedCache<VacancyDetails> {
        &self.details_cache
    }

    /// The health supervisor feeding source selection.
    pub fn health(&self) -> &HealthSupervisor {
        &self.health
    }

    /// Submit a search job and wait for its completion.
    pub async fn search_vacancies(
        &self,
        params: SearchParams,
    ) -> Result<SearchOutcome, ManagerError> {
        let params = params.normalize();
        let (job, rx) = SearchJob::new(params);
        self.try_enqueue(Job::Search(job)).await?;
        Self::await_reply(rx).await
    }

    /// Submit a details-fetch job and wait for its completion.
    pub async fn execute_fetch_details(
        &self,
        source: &str,
        vacancy_id: &str,
    ) -> Result<VacancyDetails, ManagerError> {
        let (job, rx) = FetchDetailsJob::new(source, vacancy_id);
        self.try_enqueue(Job::FetchDetails(job)).await?;
        Self::await_reply(rx).await
    }

    /// Graceful shutdown: stop the workers, then the supervisor, then
    /// every background task owned by the components, all under one
    /// ceiling. Jobs still queued after the window are dropped and their
    /// callers run into the result-wait timeout.
    pub async fn shutdown(&self) {
        info!("parser manager shutting down");
        let _ = self.stop.send(true);
        self.queue.close();

        let handles: Vec<JoinHandle<()>> = {
            let mut workers = self.workers.lock().expect("worker list poisoned");
            workers.drain(..).collect()
        };

        let drain = async {
            for handle in handles {
                let _ = handle.await;
            }
            self.health.stop().await;
        };

        if tokio::time::timeout(SHUTDOWN_WINDOW, drain).await.is_err() {
            warn!("shutdown window elapsed with workers still running");
        }

        for source in &self.sources {
            source.stop();
        }

        self.search_cache.close();
        self.index_cache.close();
        self.details_cache.close();

        info!("parser manager stopped");
    }

    fn spawn_workers(self: &Arc<Self>) {
        let mut workers = self.workers.lock().expect("worker list poisoned");
        for worker_id in 0..self.sizing.workers {
            let manager = Arc::clone(self);
            let stop_rx = self.stop.subscribe();
            workers.push(tokio::spawn(async move {
                manager.worker_loop(worker_id, stop_rx).await;
            }));
        }
    }

    /// Enqueue with retries inside a fixed window. The queue hands a
    /// rejected job back, so the same completion channel survives every
    /// attempt.
    async fn try_enqueue(&self, mut job: Job) -> Result<(), ManagerError> {
        let started = Instant::now();
        loop {
            match self.queue.enqueue(job) {
                Ok(()) => return Ok(()),
                Err(rejected) => {
                    if started.elapsed() >= ENQUEUE_WINDOW {
                        return Err(ManagerError::QueueFull);
                    }
                    job = rejected;
                    tokio::time::sleep(ENQUEUE_RETRY_PAUSE).await;
                }
            }
        }
    }

    async fn await_reply<T>(rx: oneshot::Receiver<Result<T, ManagerError>>) -> Result<T, ManagerError> {
        match tokio::time::timeout(RESULT_WAIT, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(ManagerError::ResultChannelClosed),
            Err(_) => Err(ManagerError::WaitTimeout),
        }
    }

    pub(crate) async fn acquire_slot(
        &self,
    ) -> Result<tokio::sync::OwnedSemaphorePermit, ManagerError> {
        match tokio::time::timeout(
            self.sizing.slot_wait,
            Arc::clone(&self.slots).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => Ok(permit),
            _ => Err(ManagerError::SlotTimeout),
        }
    }

    pub(crate) fn adapter(&self, name: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.sources
            .iter()
            .find(|s| s.name() == name)
            .map(Arc::clone)
    }
}

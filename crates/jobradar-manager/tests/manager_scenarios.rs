//! End-to-end manager scenarios over stub source adapters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use jobradar_manager::{
    HealthCheckConfig, HealthSupervisor, ManagerConfig, ManagerError, ParserManager, PoolSizing,
    SearchWarning,
};
use jobradar_models::{composite_key, SearchParams, SourceResult, Vacancy, VacancyDetails};
use jobradar_sources::{BreakerConfig, SourceAdapter, SourceError};

type SearchFn = dyn Fn() -> Result<Vec<Vacancy>, SourceError> + Send + Sync;

/// Scriptable in-process source.
struct StubSource {
    name: String,
    search_calls: AtomicUsize,
    details_calls: AtomicUsize,
    delay: Duration,
    respond: Box<SearchFn>,
}

impl StubSource {
    fn new(
        name: &str,
        respond: impl Fn() -> Result<Vec<Vacancy>, SourceError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            search_calls: AtomicUsize::new(0),
            details_calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            respond: Box::new(respond),
        })
    }

    fn slow(
        name: &str,
        delay: Duration,
        respond: impl Fn() -> Result<Vec<Vacancy>, SourceError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            search_calls: AtomicUsize::new(0),
            details_calls: AtomicUsize::new(0),
            delay,
            respond: Box::new(respond),
        })
    }

    fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for StubSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn health_endpoint(&self) -> &str {
        ""
    }

    async fn search_vacancies(&self, _params: &SearchParams) -> Result<Vec<Vacancy>, SourceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.respond)()
    }

    async fn fetch_details(&self, vacancy_id: &str) -> Result<VacancyDetails, SourceError> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        Ok(VacancyDetails {
            id: vacancy_id.to_string(),
            title: format!("{} vacancy {vacancy_id}", self.name),
            ..Default::default()
        })
    }

    fn stop(&self) {}
}

/// Source whose details endpoint blows up in the worker's call path.
struct PanickingSource;

#[async_trait]
impl SourceAdapter for PanickingSource {
    fn name(&self) -> &str {
        "hh"
    }

    fn health_endpoint(&self) -> &str {
        ""
    }

    async fn search_vacancies(&self, _params: &SearchParams) -> Result<Vec<Vacancy>, SourceError> {
        Ok(vec![vacancy("hh", "1")])
    }

    async fn fetch_details(&self, _vacancy_id: &str) -> Result<VacancyDetails, SourceError> {
        panic!("details decoder exploded");
    }

    fn stop(&self) {}
}

fn vacancy(source: &str, id: &str) -> Vacancy {
    Vacancy {
        id: id.to_string(),
        title: format!("Engineer {id}"),
        company: "Acme".to_string(),
        salary: None,
        currency: "RUB".to_string(),
        location: "Moscow".to_string(),
        url: format!("https://{source}.example/{id}"),
        source: source.to_string(),
        description: String::new(),
    }
}

fn test_config() -> ManagerConfig {
    ManagerConfig {
        fanout_timeout: Duration::from_secs(2),
        // Sweepers off; these tests only exercise TTL-visible state.
        search_cleanup: Duration::ZERO,
        index_cleanup: Duration::ZERO,
        details_cleanup: Duration::ZERO,
        sizing: Some(PoolSizing {
            workers: 2,
            semaphore: 2,
            queue: 8,
            slot_wait: Duration::from_millis(200),
        }),
        ..Default::default()
    }
}

async fn supervisor() -> Arc<HealthSupervisor> {
    // No registered endpoints: the probe pass is a no-op and tests feed
    // health through update_status.
    let supervisor = Arc::new(HealthSupervisor::start(HealthCheckConfig::default(), &[]));
    supervisor.wait_ready().await;
    supervisor
}

#[tokio::test]
async fn cache_hit_skips_the_adapters() {
    let source = StubSource::new("hh", || Ok(vec![vacancy("hh", "1"), vacancy("hh", "2")]));
    let manager = ParserManager::new(test_config(), supervisor().await, vec![source.clone()]).unwrap();

    let params = SearchParams::new("go");
    let first = manager.search_vacancies(params.clone()).await.unwrap();
    assert_eq!(first.results.len(), 1);
    assert_eq!(source.search_calls(), 1);

    let second = manager.search_vacancies(params).await.unwrap();
    assert_eq!(second.results.len(), 1);
    assert!(second.warning.is_none());
    // No adapter touched on the cached pass.
    assert_eq!(source.search_calls(), 1);

    manager.shutdown().await;
}

#[tokio::test]
async fn partial_fanout_caches_only_the_successful_source() {
    let good = StubSource::new("hh", || {
        Ok(vec![
            vacancy("hh", "1"),
            vacancy("hh", "2"),
            vacancy("hh", "3"),
        ])
    });
    let bad = StubSource::new("superjob", || {
        Err(SourceError::UpstreamServer {
            status: 500,
            body: "upstream exploded".to_string(),
        })
    });
    let manager = ParserManager::new(
        test_config(),
        supervisor().await,
        vec![good.clone(), bad.clone()],
    )
    .unwrap();

    let params = SearchParams::new("rust");
    let outcome = manager.search_vacancies(params.clone()).await.unwrap();

    assert_eq!(outcome.results.len(), 2);
    let failed: Vec<&SourceResult> = outcome
        .results
        .iter()
        .filter(|r| r.error.is_some())
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].source, "superjob");

    // Only the successful subset is cached.
    let cached = manager
        .search_cache()
        .get(&params.clone().normalize().fingerprint())
        .unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].source, "hh");

    // Reverse index holds exactly the three hh vacancies.
    assert_eq!(manager.index_cache().len(), 3);
    for id in ["1", "2", "3"] {
        let entry = manager.index_cache().get(&composite_key("hh", id)).unwrap();
        assert_eq!(entry.search_key, params.clone().normalize().fingerprint());
        assert_eq!(entry.source, "hh");
    }
    assert!(manager.index_cache().get(&composite_key("superjob", "1")).is_none());

    manager.shutdown().await;
}

#[tokio::test]
async fn breaker_open_falls_back_to_cached_results() {
    let source = StubSource::new("hh", || {
        Err(SourceError::Unavailable {
            name: "hh".to_string(),
        })
    });

    let mut config = test_config();
    // Two total failures trip the global breaker.
    config.breaker = BreakerConfig {
        failure_threshold: 2,
        reset_timeout: Duration::from_secs(60),
        ..Default::default()
    };
    let manager = ParserManager::new(config, supervisor().await, vec![source.clone()]).unwrap();

    let params = SearchParams::new("go");

    // No cache entry: the failure surfaces and is recognizably
    // breaker-born.
    let err = manager.search_vacancies(params.clone()).await.unwrap_err();
    assert!(err.is_breaker_origin(), "got: {err}");
    let err = manager.search_vacancies(params.clone()).await.unwrap_err();
    assert!(err.is_breaker_origin());

    // Pre-populate the cache for the same fingerprint, then rerun with
    // the global breaker now open.
    let key = params.clone().normalize().fingerprint();
    let cached = vec![SourceResult {
        source: "hh".to_string(),
        vacancies: vec![vacancy("hh", "9")],
        search_key: key.clone(),
        error: None,
        duration: Duration::from_millis(3),
    }];
    manager
        .search_cache()
        .insert(key, cached, Duration::from_secs(60));

    let outcome = manager.search_vacancies(params).await.unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].vacancies[0].id, "9");
    assert!(
        matches!(outcome.warning, Some(SearchWarning::StaleCache(_))),
        "got: {:?}",
        outcome.warning
    );

    manager.shutdown().await;
}

#[tokio::test]
async fn queue_backpressure_rejects_the_overflow_job() {
    let source = StubSource::new("hh", || Ok(vec![vacancy("hh", "1")]));

    let mut config = test_config();
    // No workers: nothing drains the queue.
    config.sizing = Some(PoolSizing {
        workers: 0,
        semaphore: 2,
        queue: 4,
        slot_wait: Duration::from_millis(200),
    });
    let manager = ParserManager::new(config, supervisor().await, vec![source]).unwrap();

    // Fill the queue with four jobs whose callers keep waiting.
    let mut fillers = Vec::new();
    for i in 0..4 {
        let manager = Arc::clone(&manager);
        fillers.push(tokio::spawn(async move {
            let _ = manager
                .search_vacancies(SearchParams::new(format!("job {i}")))
                .await;
        }));
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    // The fifth job retries for the enqueue window, then gives up.
    let started = Instant::now();
    let err = manager
        .search_vacancies(SearchParams::new("overflow"))
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::QueueFull));
    assert!(started.elapsed() <= Duration::from_secs(6));

    for filler in fillers {
        filler.abort();
    }
    manager.shutdown().await;
}

#[tokio::test]
async fn details_path_refuses_unhealthy_sources_and_caches_hits() {
    let source = StubSource::new("hh", || Ok(vec![vacancy("hh", "1")]));
    let supervisor = supervisor().await;
    let manager =
        ParserManager::new(test_config(), Arc::clone(&supervisor), vec![source.clone()]).unwrap();

    // Not reported healthy yet: the manager refuses to call out.
    let err = manager.execute_fetch_details("hh", "42").await.unwrap_err();
    assert!(matches!(err, ManagerError::SourceUnhealthy { .. }));

    supervisor.update_status("hh", true, None);

    let details = manager.execute_fetch_details("hh", "42").await.unwrap();
    assert_eq!(details.id, "42");
    assert_eq!(source.details_calls.load(Ordering::SeqCst), 1);

    // Second fetch is served from the details cache.
    let again = manager.execute_fetch_details("hh", "42").await.unwrap();
    assert_eq!(again.id, "42");
    assert_eq!(source.details_calls.load(Ordering::SeqCst), 1);

    // Unknown sources are rejected as such.
    let err = manager.execute_fetch_details("nowhere", "42").await.unwrap_err();
    assert!(matches!(err, ManagerError::SourceUnhealthy { .. } | ManagerError::UnknownSource { .. }));

    manager.shutdown().await;
}

#[tokio::test]
async fn empty_fanout_is_not_cached_and_retries() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = Arc::clone(&attempts);
    let source = StubSource::new("hh", move || {
        if attempts_clone.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(SourceError::UpstreamServer {
                status: 502,
                body: "bad gateway".to_string(),
            })
        } else {
            Ok(vec![vacancy("hh", "7")])
        }
    });
    let manager = ParserManager::new(test_config(), supervisor().await, vec![source.clone()]).unwrap();

    let params = SearchParams::new("retry me");
    let err = manager.search_vacancies(params.clone()).await.unwrap_err();
    assert!(matches!(err, ManagerError::AllSourcesFailed { .. }));

    // Nothing cached, so the second call reaches the adapter and wins.
    let outcome = manager.search_vacancies(params).await.unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.results[0].is_successful());
    assert_eq!(source.search_calls(), 2);

    manager.shutdown().await;
}

#[tokio::test]
async fn fanout_timeout_turns_a_slow_source_into_a_timeout_result() {
    let fast = StubSource::new("hh", || Ok(vec![vacancy("hh", "1")]));
    let slow = StubSource::slow("superjob", Duration::from_secs(5), || {
        Ok(vec![vacancy("superjob", "2")])
    });

    let mut config = test_config();
    config.fanout_timeout = Duration::from_millis(200);
    let manager = ParserManager::new(
        config,
        supervisor().await,
        vec![fast.clone(), slow.clone()],
    )
    .unwrap();

    let outcome = manager
        .search_vacancies(SearchParams::new("slowpoke"))
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 2);
    let timed_out = outcome
        .results
        .iter()
        .find(|r| r.source == "superjob")
        .unwrap();
    assert_eq!(timed_out.error.as_deref(), Some("timeout exceeded"));
    let fast_result = outcome.results.iter().find(|r| r.source == "hh").unwrap();
    assert!(fast_result.is_successful());

    // Only the fast source made it into the cache.
    let cached = manager
        .search_cache()
        .get(&SearchParams::new("slowpoke").fingerprint())
        .unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].source, "hh");

    manager.shutdown().await;
}

#[tokio::test]
async fn worker_recovers_a_panicking_details_fetch() {
    let supervisor = supervisor().await;
    let source: Arc<dyn SourceAdapter> = Arc::new(PanickingSource);
    let manager =
        ParserManager::new(test_config(), Arc::clone(&supervisor), vec![source]).unwrap();

    supervisor.update_status("hh", true, None);

    // The panic is recovered per-job and reported as the job's error;
    // the caller is never left waiting.
    let err = manager.execute_fetch_details("hh", "42").await.unwrap_err();
    assert!(matches!(err, ManagerError::JobPanicked(_)), "got: {err}");

    // The worker pool survives and keeps serving.
    let outcome = manager
        .search_vacancies(SearchParams::new("still alive"))
        .await
        .unwrap();
    assert_eq!(outcome.results.len(), 1);

    manager.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_workers_and_closes_the_queue() {
    let source = StubSource::new("hh", || Ok(vec![vacancy("hh", "1")]));
    let manager = ParserManager::new(test_config(), supervisor().await, vec![source]).unwrap();

    let started = Instant::now();
    manager.shutdown().await;
    assert!(started.elapsed() < Duration::from_secs(10));
}

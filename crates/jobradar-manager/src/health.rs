//! Source health supervisor.
//!
//! Keeps the authoritative per-source health map. A background task
//! performs one synchronous probe pass on startup, signals readiness,
//! then repeats on an interval; every real search call additionally
//! feeds the map through [`HealthSupervisor::update_status`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A source is only considered live while its last check is this fresh.
const FRESHNESS_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Probe tuning.
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// Timeout for one probe request
    pub request_timeout: Duration,
    /// Interval between probe passes
    pub check_interval: Duration,
    /// Keep-alive connections retained per probed host
    pub max_idle_per_host: usize,
    pub connect_timeout: Duration,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            check_interval: Duration::from_secs(15),
            max_idle_per_host: 2,
            connect_timeout: Duration::from_secs(3),
        }
    }
}

/// Per-source record held by the supervisor.
#[derive(Debug, Clone)]
pub struct SourceStatus {
    pub name: String,
    pub health_endpoint: String,
    pub last_check: DateTime<Utc>,
    pub last_success: Option<DateTime<Utc>>,
    pub success_count: u64,
    pub error_count: u64,
    pub healthy: bool,
    pub last_error: Option<String>,
    pub circuit_state: String,
    pub initialized: bool,
    pub response_time: Option<Duration>,
    // Freshness is judged on a monotonic clock; the chrono fields are
    // for reporting only.
    checked_at: Instant,
}

impl SourceStatus {
    fn register(name: &str, health_endpoint: &str) -> Self {
        Self {
            name: name.to_string(),
            health_endpoint: health_endpoint.to_string(),
            last_check: Utc::now(),
            last_success: None,
            success_count: 0,
            error_count: 0,
            healthy: false,
            last_error: None,
            circuit_state: "closed".to_string(),
            initialized: false,
            response_time: None,
            checked_at: Instant::now(),
        }
    }

    fn is_fresh(&self) -> bool {
        self.checked_at.elapsed() < FRESHNESS_WINDOW
    }
}

struct ProbeResult {
    name: String,
    healthy: bool,
    response_time: Duration,
    error: Option<String>,
}

struct Inner {
    statuses: RwLock<HashMap<String, SourceStatus>>,
    client: reqwest::Client,
    config: HealthCheckConfig,
}

/// Periodic liveness prober plus call-outcome accumulator.
pub struct HealthSupervisor {
    inner: Arc<Inner>,
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    ready: Mutex<Option<oneshot::Receiver<()>>>,
}

impl HealthSupervisor {
    /// Register `sources` as (name, health endpoint) pairs and start the
    /// background prober.
    pub fn start(config: HealthCheckConfig, sources: &[(String, String)]) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()
            .expect("health client builds from static settings");

        let mut statuses = HashMap::new();
        for (name, endpoint) in sources {
            statuses.insert(name.clone(), SourceStatus::register(name, endpoint));
        }

        let inner = Arc::new(Inner {
            statuses: RwLock::new(statuses),
            client,
            config,
        });

        let (stop, stop_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = oneshot::channel();
        let task = tokio::spawn(supervise(Arc::clone(&inner), stop_rx, ready_tx));

        Self {
            inner,
            stop,
            task: Mutex::new(Some(task)),
            ready: Mutex::new(Some(ready_rx)),
        }
    }

    /// Wait until the initial probe pass has been applied.
    pub async fn wait_ready(&self) {
        let rx = self.ready.lock().expect("ready slot poisoned").take();
        if let Some(rx) = rx {
            let _ = rx.await;
        }
    }

    /// Record the outcome of a real call against `name`.
    pub fn update_status(&self, name: &str, success: bool, error: Option<String>) {
        let mut statuses = self.inner.statuses.write().expect("health map poisoned");
        let status = statuses
            .entry(name.to_string())
            .or_insert_with(|| SourceStatus::register(name, ""));

        status.last_check = Utc::now();
        status.checked_at = Instant::now();
        status.initialized = true;

        if success {
            status.success_count += 1;
            status.error_count = 0;
            status.healthy = true;
            status.last_error = None;
            status.last_success = Some(status.last_check);
        } else {
            status.error_count += 1;
            status.success_count = 0;
            status.healthy = false;
            status.last_error = error;
        }
    }

    /// Names of sources that are healthy and recently checked.
    pub fn healthy_sources(&self) -> Vec<String> {
        let statuses = self.inner.statuses.read().expect("health map poisoned");
        statuses
            .values()
            .filter(|s| s.healthy && s.is_fresh())
            .map(|s| s.name.clone())
            .collect()
    }

    pub fn is_healthy(&self, name: &str) -> bool {
        let statuses = self.inner.statuses.read().expect("health map poisoned");
        statuses
            .get(name)
            .map(|s| s.healthy && s.is_fresh())
            .unwrap_or(false)
    }

    pub fn status(&self, name: &str) -> Option<SourceStatus> {
        let statuses = self.inner.statuses.read().expect("health map poisoned");
        statuses.get(name).cloned()
    }

    pub fn all_statuses(&self) -> Vec<SourceStatus> {
        let statuses = self.inner.statuses.read().expect("health map poisoned");
        statuses.values().cloned().collect()
    }

    /// Stop the supervisor and wait for it to exit. Idempotent.
    pub async fn stop(&self) {
        let _ = self.stop.send(true);
        let handle = self.task.lock().expect("task slot poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn supervise(inner: Arc<Inner>, mut stop_rx: watch::Receiver<bool>, ready_tx: oneshot::Sender<()>) {
    // Initial synchronous pass so the first search has data to go on.
    perform_pass(&inner).await;
    let _ = ready_tx.send(());

    let mut ticker = tokio::time::interval(inner.config.check_interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                perform_pass(&inner).await;
            }
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    debug!("health supervisor stopped");
                    return;
                }
            }
        }
    }
}

async fn perform_pass(inner: &Arc<Inner>) {
    let targets: Vec<(String, String)> = {
        let statuses = inner.statuses.read().expect("health map poisoned");
        statuses
            .values()
            .map(|s| (s.name.clone(), s.health_endpoint.clone()))
            .collect()
    };

    if targets.is_empty() {
        return;
    }

    let (tx, mut rx) = mpsc::channel(targets.len());

    for (name, endpoint) in targets {
        let tx = tx.clone();
        let client = inner.client.clone();
        tokio::spawn(async move {
            let result = probe(&client, &name, &endpoint).await;
            let _ = tx.send(result).await;
        });
    }
    drop(tx);

    while let Some(result) = rx.recv().await {
        let mut statuses = inner.statuses.write().expect("health map poisoned");
        if let Some(status) = statuses.get_mut(&result.name) {
            status.healthy = result.healthy;
            status.last_check = Utc::now();
            status.checked_at = Instant::now();
            status.initialized = true;
            status.response_time = Some(result.response_time);
            if result.healthy {
                status.last_success = Some(status.last_check);
            } else {
                status.last_error = result.error.clone();
            }
        }
        if !result.healthy {
            warn!(
                source = %result.name,
                error = result.error.as_deref().unwrap_or("non-2xx status"),
                "health probe failed"
            );
        }
    }
}

async fn probe(client: &reqwest::Client, name: &str, endpoint: &str) -> ProbeResult {
    let start = Instant::now();
    let outcome = client
        .get(endpoint)
        .header(reqwest::header::USER_AGENT, "SourceHealthCheck/1.0")
        .send()
        .await;
    let response_time = start.elapsed();

    match outcome {
        Ok(response) if response.status().is_success() => ProbeResult {
            name: name.to_string(),
            healthy: true,
            response_time,
            error: None,
        },
        Ok(response) => ProbeResult {
            name: name.to_string(),
            healthy: false,
            response_time,
            error: Some(format!("health check failed with status {}", response.status())),
        },
        Err(err) => ProbeResult {
            name: name.to_string(),
            healthy: false,
            response_time,
            error: Some(err.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick_config() -> HealthCheckConfig {
        HealthCheckConfig {
            request_timeout: Duration::from_secs(2),
            check_interval: Duration::from_secs(60),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn initial_pass_marks_reachable_sources_healthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let supervisor = HealthSupervisor::start(
            quick_config(),
            &[
                ("up".to_string(), format!("{}/ping", server.uri())),
                ("down".to_string(), format!("{}/missing", server.uri())),
            ],
        );
        supervisor.wait_ready().await;

        assert_eq!(supervisor.healthy_sources(), vec!["up".to_string()]);
        assert!(supervisor.is_healthy("up"));
        assert!(!supervisor.is_healthy("down"));

        let status = supervisor.status("up").unwrap();
        assert!(status.initialized);
        assert!(status.response_time.is_some());

        supervisor.stop().await;
        supervisor.stop().await;
    }

    #[tokio::test]
    async fn update_status_feeds_the_map() {
        let supervisor = HealthSupervisor::start(quick_config(), &[]);
        supervisor.wait_ready().await;

        supervisor.update_status("hh", true, None);
        assert!(supervisor.is_healthy("hh"));
        let status = supervisor.status("hh").unwrap();
        assert_eq!(status.success_count, 1);
        assert!(status.last_success.is_some());

        supervisor.update_status("hh", false, Some("boom".to_string()));
        assert!(!supervisor.is_healthy("hh"));
        let status = supervisor.status("hh").unwrap();
        assert_eq!(status.error_count, 1);
        assert_eq!(status.success_count, 0);
        assert_eq!(status.last_error.as_deref(), Some("boom"));

        supervisor.stop().await;
    }
}

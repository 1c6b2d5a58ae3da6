//! Three-state circuit breaker.
//!
//! Closed passes traffic and counts consecutive failures; Open rejects
//! everything until the reset timeout elapses; HalfOpen admits a capped
//! number of probe calls and closes again after enough successes. The
//! state lock is held only for transition bookkeeping, never across the
//! guarded operation. Half-open admission is an atomic reservation with
//! a compensating decrement so concurrent callers cannot over-admit.

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Circuit breaker tuning. Non-positive values fall back to defaults.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Consecutive failures in Closed before tripping Open
    pub failure_threshold: u32,
    /// Cumulative HalfOpen successes required to close
    pub success_threshold: u32,
    /// In-flight probe calls admitted while HalfOpen
    pub half_open_max_requests: u32,
    /// How long Open rejects before probing again
    pub reset_timeout: Duration,
    /// Statistics window
    pub window: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            half_open_max_requests: 2,
            reset_timeout: Duration::from_secs(10),
            window: Duration::from_secs(10),
        }
    }
}

impl BreakerConfig {
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.failure_threshold == 0 {
            self.failure_threshold = defaults.failure_threshold;
        }
        if self.success_threshold == 0 {
            self.success_threshold = defaults.success_threshold;
        }
        if self.half_open_max_requests == 0 {
            self.half_open_max_requests = defaults.half_open_max_requests;
        }
        if self.reset_timeout.is_zero() {
            self.reset_timeout = defaults.reset_timeout;
        }
        if self.window.is_zero() {
            self.window = defaults.window;
        }
        self
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

/// Rejections and pass-through failures from [`CircuitBreaker::execute`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    #[error("circuit breaker is open")]
    Open,

    #[error("too many requests in half-open state")]
    Throttled,

    #[error("{0}")]
    Service(E),
}

impl<E> BreakerError<E> {
    /// True when the breaker rejected the call without running it.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Open | Self::Throttled)
    }
}

#[derive(Debug)]
struct StateInner {
    state: BreakerState,
    failures: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
}

enum Admission {
    Closed,
    HalfOpen,
}

/// Failure isolator shared by every caller of one upstream.
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<StateInner>,
    half_open_attempts: AtomicU32,
    total_requests: AtomicU64,
    total_successes: AtomicU64,
    total_failures: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config: config.sanitized(),
            inner: Mutex::new(StateInner {
                state: BreakerState::Closed,
                failures: 0,
                half_open_successes: 0,
                opened_at: None,
            }),
            half_open_attempts: AtomicU32::new(0),
            total_requests: AtomicU64::new(0),
            total_successes: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
        }
    }

    /// Run `op` under breaker protection.
    pub async fn execute<T, E, F, Fut>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let admission = self.admit()?;
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let result = op().await;

        match &result {
            Ok(_) => self.total_successes.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.total_failures.fetch_add(1, Ordering::Relaxed),
        };
        self.settle(admission, result.is_ok());

        result.map_err(BreakerError::Service)
    }

    /// Current state, after applying the lazy Open -> HalfOpen timer.
    pub fn state(&self) -> BreakerState {
        self.inner.lock().expect("breaker lock poisoned").state
    }

    /// Lifetime counters: (total, successes, failures). Total counts
    /// admitted calls only, so total >= successes + failures holds even
    /// with calls in flight.
    pub fn stats(&self) -> (u64, u64, u64) {
        (
            self.total_requests.load(Ordering::Relaxed),
            self.total_successes.load(Ordering::Relaxed),
            self.total_failures.load(Ordering::Relaxed),
        )
    }

    fn admit<E>(&self) -> Result<Admission, BreakerError<E>> {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");

        if inner.state == BreakerState::Open {
            let waited_out = inner
                .opened_at
                .map(|at| at.elapsed() >= self.config.reset_timeout)
                .unwrap_or(true);
            if !waited_out {
                return Err(BreakerError::Open);
            }
            // Lazy transition: the first caller past the timeout flips to
            // HalfOpen and competes for a probe slot like everyone else.
            inner.state = BreakerState::HalfOpen;
            inner.half_open_successes = 0;
            self.half_open_attempts.store(0, Ordering::SeqCst);
        }

        match inner.state {
            BreakerState::Closed => Ok(Admission::Closed),
            BreakerState::HalfOpen => {
                let attempts = self.half_open_attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if attempts > self.config.half_open_max_requests {
                    // Compensating decrement keeps the reservation count
                    // honest under concurrent admission.
                    self.half_open_attempts.fetch_sub(1, Ordering::SeqCst);
                    return Err(BreakerError::Throttled);
                }
                Ok(Admission::HalfOpen)
            }
            BreakerState::Open => unreachable!("open state handled above"),
        }
    }

    fn settle(&self, admission: Admission, success: bool) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");

        if matches!(admission, Admission::HalfOpen) && inner.state != BreakerState::HalfOpen {
            // The state moved while this probe was in flight (another probe
            // failed and reopened, or enough succeeded and closed). Release
            // the reservation and do not double-apply a transition.
            let _ = self
                .half_open_attempts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1));
            return;
        }

        if success {
            self.on_success(&mut inner);
        } else {
            self.on_failure(&mut inner);
        }
    }

    fn on_failure(&self, inner: &mut StateInner) {
        match inner.state {
            BreakerState::Closed => {
                inner.failures += 1;
                if inner.failures >= self.config.failure_threshold {
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                    inner.failures = 0;
                }
            }
            BreakerState::HalfOpen => {
                // One failed probe is enough to reopen.
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
                inner.half_open_successes = 0;
                self.half_open_attempts.store(0, Ordering::SeqCst);
            }
            BreakerState::Open => {}
        }
    }

    fn on_success(&self, inner: &mut StateInner) {
        match inner.state {
            BreakerState::Closed => {
                inner.failures = 0;
            }
            BreakerState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.success_threshold {
                    inner.state = BreakerState::Closed;
                    inner.failures = 0;
                    inner.half_open_successes = 0;
                    self.half_open_attempts.store(0, Ordering::SeqCst);
                }
            }
            BreakerState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn quick_config() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 3,
            success_threshold: 2,
            half_open_max_requests: 2,
            reset_timeout: Duration::from_millis(50),
            window: Duration::from_secs(10),
        }
    }

    async fn fail(cb: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
        cb.execute(|| async { Err::<(), _>("boom") }).await.map(|_| ())
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
        cb.execute(|| async { Ok::<_, &'static str>(()) }).await
    }

    #[test]
    fn zero_config_values_fall_back_to_defaults() {
        let cb = CircuitBreaker::new(BreakerConfig {
            failure_threshold: 0,
            success_threshold: 0,
            half_open_max_requests: 0,
            reset_timeout: Duration::ZERO,
            window: Duration::ZERO,
        });
        assert_eq!(cb.config.failure_threshold, 5);
        assert_eq!(cb.config.success_threshold, 3);
        assert_eq!(cb.config.half_open_max_requests, 2);
        assert_eq!(cb.config.reset_timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn alternating_results_below_threshold_never_open() {
        let cb = CircuitBreaker::new(quick_config());
        for _ in 0..10 {
            let _ = fail(&cb).await;
            let _ = succeed(&cb).await;
        }
        assert_eq!(cb.state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn consecutive_failures_trip_open_and_reject() {
        let cb = CircuitBreaker::new(quick_config());
        for _ in 0..3 {
            let _ = fail(&cb).await;
        }
        assert_eq!(cb.state(), BreakerState::Open);

        let rejected = succeed(&cb).await;
        assert!(matches!(rejected, Err(BreakerError::Open)));
    }

    #[tokio::test]
    async fn recovers_through_half_open() {
        let cb = CircuitBreaker::new(quick_config());
        for _ in 0..3 {
            let _ = fail(&cb).await;
        }

        tokio::time::sleep(Duration::from_millis(60)).await;

        // Two half-open successes close the breaker again.
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), BreakerState::HalfOpen);
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens_immediately() {
        let cb = CircuitBreaker::new(quick_config());
        for _ in 0..3 {
            let _ = fail(&cb).await;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;

        let _ = fail(&cb).await;
        assert_eq!(cb.state(), BreakerState::Open);
        assert!(matches!(succeed(&cb).await, Err(BreakerError::Open)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn half_open_admission_is_capped() {
        let cb = Arc::new(CircuitBreaker::new(BreakerConfig {
            failure_threshold: 1,
            success_threshold: 2,
            half_open_max_requests: 3,
            reset_timeout: Duration::from_millis(50),
            window: Duration::from_secs(10),
        }));

        let _ = fail(&cb).await;
        assert_eq!(cb.state(), BreakerState::Open);
        tokio::time::sleep(Duration::from_millis(60)).await;

        let invoked = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..10 {
            let cb = Arc::clone(&cb);
            let invoked = Arc::clone(&invoked);
            handles.push(tokio::spawn(async move {
                cb.execute(|| async {
                    invoked.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok::<_, &'static str>(())
                })
                .await
            }));
        }

        let mut throttled = 0;
        for handle in handles {
            if let Err(BreakerError::Throttled) = handle.await.unwrap() {
                throttled += 1;
            }
        }

        assert!(invoked.load(Ordering::SeqCst) <= 3, "at most H probes run");
        assert!(throttled >= 7, "the rest are rejected as throttled");
    }

    #[tokio::test]
    async fn counters_are_consistent() {
        let cb = CircuitBreaker::new(quick_config());
        for _ in 0..2 {
            let _ = fail(&cb).await;
            let _ = succeed(&cb).await;
        }
        let (total, successes, failures) = cb.stats();
        assert_eq!(total, 4);
        assert_eq!(successes, 2);
        assert_eq!(failures, 2);
        assert!(total >= successes + failures);
    }
}

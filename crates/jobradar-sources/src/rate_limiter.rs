//! Interval-based rate limiter.
//!
//! A producer task banks one permit into a capacity-1 bucket every
//! interval. A full bucket drops the tick, so idle time never builds up
//! a burst of debt. Waiters either take a permit, observe the limiter
//! stopped, or are cancelled by their caller dropping the future.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("rate interval must be greater than zero")]
    InvalidInterval,

    #[error("rate limiter stopped")]
    Stopped,
}

/// Paces callers to at most one call per interval, with a single banked
/// token of burst.
pub struct IntervalLimiter {
    permits: Arc<Semaphore>,
    stop: watch::Sender<bool>,
    producer: Mutex<Option<JoinHandle<()>>>,
}

impl IntervalLimiter {
    /// Start a limiter emitting one token every `interval`.
    pub fn new(interval: Duration) -> Result<Self, RateLimitError> {
        if interval.is_zero() {
            return Err(RateLimitError::InvalidInterval);
        }

        let permits = Arc::new(Semaphore::new(0));
        let (stop, mut stop_rx) = watch::channel(false);

        let producer_permits = Arc::clone(&permits);
        let producer = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first interval tick completes immediately; consume it so
            // the first token arrives one interval after construction.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Capacity-1 bucket: skip the tick when a token is
                        // already banked.
                        if producer_permits.available_permits() == 0 {
                            producer_permits.add_permits(1);
                        }
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            return;
                        }
                    }
                }
            }
        });

        Ok(Self {
            permits,
            stop,
            producer: Mutex::new(Some(producer)),
        })
    }

    /// Consume one token. Resolves when a token is available, or with
    /// `Stopped` once the limiter has been stopped. Cancellation is the
    /// caller dropping this future.
    pub async fn acquire(&self) -> Result<(), RateLimitError> {
        match self.permits.acquire().await {
            Ok(permit) => {
                permit.forget();
                Ok(())
            }
            Err(_) => Err(RateLimitError::Stopped),
        }
    }

    /// Stop the limiter. Idempotent; every pending and future `acquire`
    /// resolves to `Stopped`.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
        self.permits.close();
        if let Some(handle) = self.producer.lock().expect("producer slot poisoned").take() {
            handle.abort();
        }
    }
}

impl Drop for IntervalLimiter {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn rejects_zero_interval() {
        assert!(matches!(
            IntervalLimiter::new(Duration::ZERO),
            Err(RateLimitError::InvalidInterval)
        ));
    }

    #[tokio::test]
    async fn first_token_arrives_within_one_interval() {
        let limiter = IntervalLimiter::new(Duration::from_millis(20)).unwrap();
        let start = Instant::now();
        limiter.acquire().await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed < Duration::from_millis(200), "waited {elapsed:?}");
    }

    #[tokio::test]
    async fn fast_interval_never_blocks_indefinitely() {
        let limiter = IntervalLimiter::new(Duration::from_millis(1)).unwrap();
        for _ in 0..20 {
            tokio::time::timeout(Duration::from_secs(1), limiter.acquire())
                .await
                .expect("acquire should resolve quickly")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn no_debt_accrues_while_idle() {
        let limiter = IntervalLimiter::new(Duration::from_millis(10)).unwrap();
        // Give the producer time to tick many times into the full bucket.
        tokio::time::sleep(Duration::from_millis(80)).await;

        // Exactly one banked token is consumable instantly.
        limiter.acquire().await.unwrap();
        let second = tokio::time::timeout(Duration::from_millis(2), limiter.acquire()).await;
        assert!(second.is_err(), "second token must wait for the next tick");
    }

    #[tokio::test]
    async fn stop_wakes_pending_and_future_waiters() {
        let limiter = Arc::new(IntervalLimiter::new(Duration::from_secs(3600)).unwrap());

        let pending = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire().await })
        };
        tokio::task::yield_now().await;

        limiter.stop();
        limiter.stop();

        assert_eq!(pending.await.unwrap(), Err(RateLimitError::Stopped));
        assert_eq!(limiter.acquire().await, Err(RateLimitError::Stopped));
    }
}

//! Sharded in-memory TTL cache.
//!
//! A fixed array of independently locked shards, each a map from string
//! key to a value with an absolute expiry instant. A background sweeper
//! task removes expired entries on a configurable interval; expired
//! entries are also invisible to readers before the sweeper gets to
//! them, so presence is equivalent to not-expired-at-probe-time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default shard count.
pub const DEFAULT_SHARDS: usize = 7;
/// Upper bound on the shard count accepted by the constructor.
pub const MAX_SHARDS: usize = 1000;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("shard count must be in 1..={MAX_SHARDS}, got {0}")]
    InvalidShardCount(usize),
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

type Shard<V> = RwLock<HashMap<String, Entry<V>>>;

struct Inner<V> {
    shards: Vec<Shard<V>>,
}

impl<V> Inner<V> {
    fn shard(&self, key: &str) -> &Shard<V> {
        &self.shards[shard_index(key, self.shards.len())]
    }

    fn sweep(&self) {
        let now = Instant::now();
        for shard in &self.shards {
            let mut items = shard.write().expect("cache shard lock poisoned");
            items.retain(|_, entry| entry.expires_at > now);
        }
    }
}

// FNV-1a over the key bytes; must be stable across calls so a key always
// lands on the same shard.
fn shard_index(key: &str, num_shards: usize) -> usize {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    (hash % num_shards as u64) as usize
}

/// Concurrent key-value store with per-entry expiry and background sweep.
///
/// Cloning is cheap and shares the underlying shards. One instance is
/// created per payload type; the value type carries no trait objects.
pub struct ShardedCache<V> {
    inner: Arc<Inner<V>>,
    stop: watch::Sender<bool>,
    sweeper: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<V> Clone for ShardedCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            stop: self.stop.clone(),
            sweeper: Arc::clone(&self.sweeper),
        }
    }
}

impl<V: Send + Sync + 'static> ShardedCache<V> {
    /// Create a cache with `num_shards` shards, sweeping expired entries
    /// every `cleanup_interval`. A zero interval disables the sweeper;
    /// entries are then dropped lazily on read or overwrite.
    pub fn new(num_shards: usize, cleanup_interval: Duration) -> Result<Self, CacheError> {
        if num_shards == 0 || num_shards > MAX_SHARDS {
            return Err(CacheError::InvalidShardCount(num_shards));
        }

        let mut shards = Vec::with_capacity(num_shards);
        for _ in 0..num_shards {
            shards.push(RwLock::new(HashMap::new()));
        }

        let inner = Arc::new(Inner { shards });
        let (stop, stop_rx) = watch::channel(false);

        let sweeper = if cleanup_interval > Duration::ZERO {
            Some(spawn_sweeper(Arc::clone(&inner), cleanup_interval, stop_rx))
        } else {
            None
        };

        Ok(Self {
            inner,
            stop,
            sweeper: Arc::new(Mutex::new(sweeper)),
        })
    }

    /// Create a cache with the default shard count.
    pub fn with_defaults(cleanup_interval: Duration) -> Self {
        Self::new(DEFAULT_SHARDS, cleanup_interval).expect("default shard count is valid")
    }

    /// Write a value under `key`, overwriting any prior entry.
    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let mut items = self
            .inner
            .shard(&key)
            .write()
            .expect("cache shard lock poisoned");
        items.insert(key, entry);
    }

    /// Remove the entry for `key` if present; idempotent.
    pub fn remove(&self, key: &str) {
        let mut items = self
            .inner
            .shard(key)
            .write()
            .expect("cache shard lock poisoned");
        items.remove(key);
    }

    /// Best-effort count of live entries, expired ones included until the
    /// next sweep.
    pub fn len(&self) -> usize {
        self.inner
            .shards
            .iter()
            .map(|s| s.read().expect("cache shard lock poisoned").len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop the sweeper. Reads and writes keep working after close.
    pub fn close(&self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.sweeper.lock().expect("sweeper slot poisoned").take() {
            handle.abort();
        }
    }
}

impl<V: Clone + Send + Sync + 'static> ShardedCache<V> {
    /// Fetch the value under `key` if an entry exists and has not expired.
    /// An expired entry is indistinguishable from an absent one.
    pub fn get(&self, key: &str) -> Option<V> {
        let items = self
            .inner
            .shard(key)
            .read()
            .expect("cache shard lock poisoned");
        let entry = items.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.value.clone())
    }
}

fn spawn_sweeper<V: Send + Sync + 'static>(
    inner: Arc<Inner<V>>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick of a tokio interval completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    inner.sweep();
                }
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        debug!("cache sweeper stopped");
                        return;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_invalid_shard_counts() {
        assert!(ShardedCache::<u32>::new(0, Duration::ZERO).is_err());
        assert!(ShardedCache::<u32>::new(MAX_SHARDS + 1, Duration::ZERO).is_err());
        assert!(ShardedCache::<u32>::new(1, Duration::ZERO).is_ok());
    }

    #[test]
    fn shard_index_is_deterministic_and_bounded() {
        for key in ["a", "hh_42", "fingerprint-0123456789abcdef"] {
            let first = shard_index(key, DEFAULT_SHARDS);
            assert_eq!(first, shard_index(key, DEFAULT_SHARDS));
            assert!(first < DEFAULT_SHARDS);
        }
    }

    #[tokio::test]
    async fn insert_get_overwrite() {
        let cache = ShardedCache::with_defaults(Duration::ZERO);
        cache.insert("k", 1u32, Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(1));

        cache.insert("k", 2u32, Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let cache = ShardedCache::with_defaults(Duration::ZERO);
        cache.insert("k", 7u32, Duration::from_millis(20));
        assert_eq!(cache.get("k"), Some(7));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let cache = ShardedCache::with_defaults(Duration::ZERO);
        cache.insert("k", 1u32, Duration::from_secs(60));
        cache.remove("k");
        cache.remove("k");
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test]
    async fn sweeper_evicts_expired_entries() {
        let cache = ShardedCache::new(4, Duration::from_millis(20)).unwrap();
        cache.insert("short", 1u32, Duration::from_millis(10));
        cache.insert("long", 2u32, Duration::from_secs(60));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long"), Some(2));
        cache.close();
    }

    #[tokio::test]
    async fn reads_survive_close() {
        let cache = ShardedCache::new(4, Duration::from_millis(10)).unwrap();
        cache.insert("k", 3u32, Duration::from_secs(60));
        cache.close();
        cache.close();
        assert_eq!(cache.get("k"), Some(3));
    }
}

//! Shared result cache for expensive lookups.
//!
//! [`ResultCache`] is a cost-bounded store with no notion of staleness.
//! [`TtlCached`] layers the freshness rule on top: a value older than its TTL
//! is refreshed by the caller that notices it. The stale-check and refresh
//! are not locked, so two callers may refresh the same key at once; the last
//! write wins.

use crate::error::Result;
use moka::sync::Cache;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One stored value with its eviction weight and insertion time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Arc<[u8]>,
    pub cost: u32,
    pub inserted_at: Instant,
}

/// Bounded, cost-weighted cache shared by every request of a datasource.
#[derive(Clone)]
pub struct ResultCache {
    inner: Cache<String, CacheEntry>,
    max_cost: u64,
}

impl ResultCache {
    pub fn new(max_cost: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_cost)
            .weigher(|_key: &String, entry: &CacheEntry| entry.cost)
            .build();
        Self { inner, max_cost }
    }

    pub fn get(&self, key: &str) -> Option<Arc<[u8]>> {
        self.inner.get(key).map(|e| e.value)
    }

    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.inner.get(key)
    }

    /// Store `value` with the given eviction weight. Entries heavier than the
    /// whole budget are not admitted.
    pub fn set(&self, key: &str, value: Vec<u8>, cost: u64) {
        let cost = cost.clamp(1, u32::MAX as u64) as u32;
        self.inner.insert(
            key.to_string(),
            CacheEntry {
                value: Arc::from(value),
                cost,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// When `key` was last written, if present.
    pub fn last_write(&self, key: &str) -> Option<Instant> {
        self.inner.get(key).map(|e| e.inserted_at)
    }

    pub fn max_cost(&self) -> u64 {
        self.max_cost
    }

    pub fn weighted_size(&self) -> u64 {
        self.inner.weighted_size()
    }

    /// Apply pending evictions. Eviction is otherwise amortised over writes.
    pub fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks();
    }
}

/// A cached value with a time-to-live, refreshed through a caller-supplied
/// async function.
pub struct TtlCached<T> {
    cache: ResultCache,
    key: String,
    ttl: Duration,
    _value: PhantomData<fn() -> T>,
}

impl<T> TtlCached<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(cache: &ResultCache, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cache: cache.clone(),
            key: key.into(),
            ttl,
            _value: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The cached value when younger than the TTL, otherwise the result of
    /// `refresh`, which then replaces the cached value. A failed refresh
    /// leaves the cache as it was.
    pub async fn get<F, Fut>(&self, refresh: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.fresh() {
            return Ok(value);
        }

        let value = match refresh().await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "Cache refresh failed");
                return Err(e);
            }
        };

        let bytes = serde_json::to_vec(&value)?;
        let cost = bytes.len() as u64;
        self.cache.set(&self.key, bytes, cost);
        tracing::debug!(key = %self.key, cost, "Cache entry refreshed");
        Ok(value)
    }

    fn fresh(&self) -> Option<T> {
        let entry = self.cache.entry(&self.key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            return None;
        }
        match serde_json::from_slice(&entry.value) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }
}

//! Response cache.

use super::backend::CacheBackend;
use crate::fingerprint::CacheKey;
use crate::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig { pub default_ttl: Duration, pub enabled: bool, pub max_entry_size: usize, pub key_prefix: String }

impl Default for CacheConfig {
    fn default() -> Self { Self { default_ttl: Duration::from_secs(300), enabled: true, max_entry_size: 10 * 1024 * 1024, key_prefix: "agent_cache".into() } }
}

impl CacheConfig {
    pub fn new() -> Self { Self::default() }
    pub fn with_ttl(mut self, ttl: Duration) -> Self { self.default_ttl = ttl; self }
    pub fn with_enabled(mut self, enabled: bool) -> Self { self.enabled = enabled; self }
    pub fn with_max_entry_size(mut self, bytes: usize) -> Self { self.max_entry_size = bytes; self }
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self { self.key_prefix = prefix.into(); self }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats { pub hits: u64, pub misses: u64, pub sets: u64, pub errors: u64 }

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 { let total = self.hits + self.misses; if total == 0 { 0.0 } else { self.hits as f64 / total as f64 } }
}

struct AtomicStats { hits: AtomicU64, misses: AtomicU64, sets: AtomicU64, errors: AtomicU64 }
impl AtomicStats {
    fn new() -> Self { Self { hits: AtomicU64::new(0), misses: AtomicU64::new(0), sets: AtomicU64::new(0), errors: AtomicU64::new(0) } }
    fn to_stats(&self) -> CacheStats { CacheStats { hits: self.hits.load(Ordering::Relaxed), misses: self.misses.load(Ordering::Relaxed), sets: self.sets.load(Ordering::Relaxed), errors: self.errors.load(Ordering::Relaxed) } }
}

/// Fingerprint-keyed response cache over a [`CacheBackend`].
///
/// `get` returns `Ok(None)` for a miss and `Err(Error::CacheUnavailable)`
/// when the store cannot be reached; callers decide how to degrade.
pub struct ResponseCache { config: CacheConfig, backend: Arc<dyn CacheBackend>, stats: Arc<AtomicStats> }

impl ResponseCache {
    pub fn new(config: CacheConfig, backend: Arc<dyn CacheBackend>) -> Self { Self { config, backend, stats: Arc::new(AtomicStats::new()) } }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>> {
        if !self.config.enabled { return Ok(None); }
        match self.backend.get(&self.store_key(key)).await {
            Ok(Some(data)) => match serde_json::from_slice(&data) {
                Ok(val) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key.short(), backend = self.backend.name(), "cache hit");
                    Ok(Some(val))
                }
                Err(e) => {
                    // Undecodable entries are treated as absent; the next put replaces them.
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    self.stats.misses.fetch_add(1, Ordering::Relaxed);
                    warn!(key = %key.short(), error = %e, "discarding undecodable cache entry");
                    Ok(None)
                }
            },
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key.short(), backend = self.backend.name(), "cache miss");
                Ok(None)
            }
            Err(e) => { self.stats.errors.fetch_add(1, Ordering::Relaxed); Err(e.into()) }
        }
    }

    /// Stores `value` under `key`, overwriting any previous entry. `ttl`
    /// falls back to the configured default.
    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Option<Duration>) -> Result<()> {
        if !self.config.enabled { return Ok(()); }
        let data = serde_json::to_vec(value)?;
        if data.len() > self.config.max_entry_size {
            debug!(key = %key.short(), size = data.len(), "response exceeds max entry size; not cached");
            return Ok(());
        }
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        match self.backend.set(&self.store_key(key), data.into(), ttl).await {
            Ok(()) => {
                self.stats.sets.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key.short(), ttl_secs = ttl.as_secs(), "cached response");
                Ok(())
            }
            Err(e) => { self.stats.errors.fetch_add(1, Ordering::Relaxed); Err(e.into()) }
        }
    }

    pub async fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        if !self.config.enabled { return Ok(false); }
        self.backend.delete(&self.store_key(key)).await.map_err(Into::into)
    }

    pub fn stats(&self) -> CacheStats { self.stats.to_stats() }
    pub fn config(&self) -> &CacheConfig { &self.config }
    pub fn backend_name(&self) -> &'static str { self.backend.name() }

    fn store_key(&self, key: &CacheKey) -> Vec<u8> { format!("{}:{}", self.config.key_prefix, key.to_hex()).into_bytes() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, StoreError};
    use crate::Error;
    use async_trait::async_trait;
    use bytes::Bytes;

    struct DownStore;

    #[async_trait]
    impl CacheBackend for DownStore {
        async fn get(&self, _: &[u8]) -> crate::cache::StoreResult<Option<Bytes>> { Err(StoreError::Unreachable("connection refused".into())) }
        async fn set(&self, _: &[u8], _: Bytes, _: Duration) -> crate::cache::StoreResult<()> { Err(StoreError::Unreachable("connection refused".into())) }
        async fn delete(&self, _: &[u8]) -> crate::cache::StoreResult<bool> { Err(StoreError::Unreachable("connection refused".into())) }
        async fn exists(&self, _: &[u8]) -> crate::cache::StoreResult<bool> { Ok(false) }
        async fn clear(&self) -> crate::cache::StoreResult<()> { Ok(()) }
        async fn len(&self) -> crate::cache::StoreResult<usize> { Ok(0) }
        fn name(&self) -> &'static str { "down" }
    }

    fn key(b: u8) -> CacheKey { CacheKey::from_bytes([b; 32]) }

    fn memory_cache() -> ResponseCache { ResponseCache::new(CacheConfig::default(), Arc::new(MemoryCache::new(64))) }

    #[tokio::test]
    async fn test_put_then_get_returns_value() {
        let cache = memory_cache();
        cache.put(&key(1), &"hello".to_string(), None).await.unwrap();
        let got: Option<String> = cache.get(&key(1)).await.unwrap();
        assert_eq!(got.as_deref(), Some("hello"));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().sets, 1);
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let cache = memory_cache();
        cache.put(&key(2), &"short-lived".to_string(), Some(Duration::from_millis(20))).await.unwrap();
        assert!(cache.get::<String>(&key(2)).await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get::<String>(&key(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cached_empty_string_is_distinct_from_miss() {
        let cache = memory_cache();
        cache.put(&key(3), &String::new(), None).await.unwrap();
        assert_eq!(cache.get::<String>(&key(3)).await.unwrap(), Some(String::new()));
        assert_eq!(cache.get::<String>(&key(4)).await.unwrap(), None);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_unreachable_store_surfaces_cache_unavailable() {
        let cache = ResponseCache::new(CacheConfig::default(), Arc::new(DownStore));
        let err = cache.get::<String>(&key(5)).await.unwrap_err();
        assert!(matches!(err, Error::CacheUnavailable(StoreError::Unreachable(_))));
        assert!(cache.put(&key(5), &"x".to_string(), None).await.is_err());
        assert_eq!(cache.stats().errors, 2);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let cache = ResponseCache::new(CacheConfig::new().with_enabled(false), Arc::new(MemoryCache::new(8)));
        cache.put(&key(6), &"v".to_string(), None).await.unwrap();
        assert!(cache.get::<String>(&key(6)).await.unwrap().is_none());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[tokio::test]
    async fn test_oversized_entries_are_skipped() {
        let cache = ResponseCache::new(CacheConfig::new().with_max_entry_size(4), Arc::new(MemoryCache::new(8)));
        cache.put(&key(7), &"too large".to_string(), None).await.unwrap();
        assert!(cache.get::<String>(&key(7)).await.unwrap().is_none());
        assert_eq!(cache.stats().sets, 0);
    }

    #[tokio::test]
    async fn test_undecodable_entry_counts_as_miss() {
        let backend = Arc::new(MemoryCache::new(8));
        let cache = ResponseCache::new(CacheConfig::default(), backend.clone());
        let raw = format!("agent_cache:{}", key(8).to_hex());
        backend.set(raw.as_bytes(), Bytes::from_static(b"not json"), Duration::from_secs(60)).await.unwrap();
        assert!(cache.get::<String>(&key(8)).await.unwrap().is_none());
        assert_eq!(cache.stats().errors, 1);
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let cache = memory_cache();
        cache.put(&key(9), &1u32, None).await.unwrap();
        assert!(cache.invalidate(&key(9)).await.unwrap());
        assert!(cache.get::<u32>(&key(9)).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_on_one_key_leave_a_written_value() {
        let cache = Arc::new(memory_cache());
        let shared = key(10);
        cache.put(&shared, &"v-init".to_string(), None).await.unwrap();

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    cache.put(&shared, &format!("v-{}", i), None).await.unwrap();
                    cache.get::<String>(&shared).await.unwrap()
                })
            })
            .collect();
        let reads = futures::future::join_all(tasks).await;

        let valid = |v: &str| v == "v-init" || (0..64).any(|i| v == format!("v-{}", i));
        for read in reads {
            let value = read.unwrap().expect("key was written before any read");
            assert!(valid(&value), "corrupted value {value}");
        }
        let last = cache.get::<String>(&shared).await.unwrap().unwrap();
        assert!(valid(&last));
        assert_eq!(cache.stats().sets, 65);
        assert_eq!(cache.stats().errors, 0);
    }
}

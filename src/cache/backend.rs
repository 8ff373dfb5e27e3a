//! Cache backend implementations.

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Failure of the backing store itself, as opposed to a miss.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store rejected operation: {0}")]
    Rejected(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Clone)]
struct CacheEntry {
    data: Bytes,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn new(data: Bytes, ttl: Duration) -> Self {
        Self {
            data,
            stored_at: Instant::now(),
            ttl,
        }
    }
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() > self.ttl
    }
}

/// Key/value store behind the response cache.
///
/// Implementations may be networked; every call can fail with a
/// [`StoreError`]. Writes are last-write-wins.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>>;
    async fn set(&self, key: &[u8], value: Bytes, ttl: Duration) -> StoreResult<()>;
    async fn delete(&self, key: &[u8]) -> StoreResult<bool>;
    async fn exists(&self, key: &[u8]) -> StoreResult<bool>;
    async fn clear(&self) -> StoreResult<()>;
    async fn len(&self) -> StoreResult<usize>;
    fn name(&self) -> &'static str;
}

/// In-process store with per-entry TTL and LRU eviction once full.
///
/// Expired entries are removed lazily when touched.
pub struct MemoryCache {
    entries: Mutex<LruCache<Vec<u8>, CacheEntry>>,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<Vec<u8>, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        let mut entries = self.lock();
        let expired = match entries.peek(key) {
            Some(entry) => entry.is_expired(),
            None => return Ok(None),
        };
        if expired {
            entries.pop(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|e| e.data.clone()))
    }
    async fn set(&self, key: &[u8], value: Bytes, ttl: Duration) -> StoreResult<()> {
        self.lock().put(key.to_vec(), CacheEntry::new(value, ttl));
        Ok(())
    }
    async fn delete(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.lock().pop(key).is_some())
    }
    async fn exists(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self
            .lock()
            .peek(key)
            .map(|e| !e.is_expired())
            .unwrap_or(false))
    }
    async fn clear(&self) -> StoreResult<()> {
        self.lock().clear();
        Ok(())
    }
    async fn len(&self) -> StoreResult<usize> {
        Ok(self.lock().iter().filter(|(_, e)| !e.is_expired()).count())
    }
    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Store that never retains anything. Every lookup misses.
pub struct NullCache;
impl NullCache {
    pub fn new() -> Self {
        Self
    }
}
impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for NullCache {
    async fn get(&self, _: &[u8]) -> StoreResult<Option<Bytes>> {
        Ok(None)
    }
    async fn set(&self, _: &[u8], _: Bytes, _: Duration) -> StoreResult<()> {
        Ok(())
    }
    async fn delete(&self, _: &[u8]) -> StoreResult<bool> {
        Ok(false)
    }
    async fn exists(&self, _: &[u8]) -> StoreResult<bool> {
        Ok(false)
    }
    async fn clear(&self) -> StoreResult<()> {
        Ok(())
    }
    async fn len(&self) -> StoreResult<usize> {
        Ok(0)
    }
    fn name(&self) -> &'static str {
        "null"
    }
}

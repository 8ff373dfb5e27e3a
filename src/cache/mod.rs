//! 响应缓存模块：按请求指纹缓存代理响应，减少重复调用。
//!
//! # Response Caching Module
//!
//! Deduplicates semantically identical agent invocations. Entries are keyed
//! by the request fingerprint (see [`crate::fingerprint`]) and expire after a
//! per-entry TTL. Staleness is bounded only by that TTL: there is no
//! invalidation when an agent chain changes.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ResponseCache`] | Typed get/put with TTL and statistics |
//! | [`CacheConfig`] | Default TTL, size limit, key prefix, on/off switch |
//! | [`CacheBackend`] | Trait for the (possibly networked) key/value store |
//! | [`MemoryCache`] | In-process LRU store with lazy expiry |
//! | [`NullCache`] | No-op store for disabling caching |
//!
//! ## Example
//!
//! ```rust
//! use agent_prefetch::cache::{CacheConfig, MemoryCache, ResponseCache};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let cache = ResponseCache::new(
//!     CacheConfig::new().with_ttl(Duration::from_secs(300)),
//!     Arc::new(MemoryCache::new(1000)),
//! );
//! assert_eq!(cache.backend_name(), "memory");
//! ```

mod backend;
mod manager;

pub use backend::{CacheBackend, MemoryCache, NullCache, StoreError, StoreResult};
pub use manager::{CacheConfig, CacheStats, ResponseCache};

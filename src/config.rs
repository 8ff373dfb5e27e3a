//! Runtime configuration.
//!
//! [`OptimizerConfig`] is a plain value object. The runtime never reads files
//! or environment variables: hosts build it in code or deserialize it from
//! whatever format they use, then hand it to
//! [`ChainOptimizerBuilder`](crate::pipeline::ChainOptimizerBuilder).

use crate::cache::CacheConfig;
use crate::prefetch::PrefetchConfig;
use crate::types::AgentId;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection parameters for a networked cache store.
///
/// The runtime does not connect anywhere itself; these values are carried for
/// the [`CacheBackend`](crate::cache::CacheBackend) implementation the host
/// plugs in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            connect_timeout: Duration::from_secs(2),
        }
    }
}

impl StoreConfig {
    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub cache: CacheConfig,
    pub prefetch: PrefetchConfig,
    pub store: StoreConfig,
    /// Default chain for [`ChainOptimizer::run`](crate::pipeline::ChainOptimizer::run).
    pub agent_ids: Vec<AgentId>,
    /// Most recent turns kept in the context threaded between hops.
    pub max_context_turns: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            prefetch: PrefetchConfig::default(),
            store: StoreConfig::default(),
            agent_ids: Vec::new(),
            max_context_turns: 32,
        }
    }
}

impl OptimizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache.default_ttl = ttl;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.prefetch.confidence_threshold = threshold;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_prefetch(mut self, prefetch: PrefetchConfig) -> Self {
        self.prefetch = prefetch;
        self
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn with_agent_ids<I, A>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<AgentId>,
    {
        self.agent_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_context_turns(mut self, turns: usize) -> Self {
        self.max_context_turns = turns;
        self
    }

    /// Rejects values the runtime cannot honor.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.prefetch.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(invalid(
                "confidence threshold must be within [0, 1]",
                "prefetch.confidence_threshold",
                format!("got {}", threshold),
            ));
        }
        if self.cache.default_ttl.is_zero() {
            return Err(invalid(
                "cache TTL must be greater than zero",
                "cache.default_ttl",
                "got 0s",
            ));
        }
        if self.prefetch.invoke_deadline.is_zero() {
            return Err(invalid(
                "invocation deadline must be greater than zero",
                "prefetch.invoke_deadline",
                "got 0s",
            ));
        }
        if self.max_context_turns == 0 {
            return Err(invalid(
                "context window must keep at least one turn",
                "max_context_turns",
                "got 0",
            ));
        }
        if let Some(pos) = self.agent_ids.iter().position(|a| a.as_str().trim().is_empty()) {
            return Err(invalid(
                "agent ids must not be blank",
                format!("agent_ids[{}]", pos),
                "blank id",
            ));
        }
        Ok(())
    }
}

fn invalid(msg: &str, field: impl Into<String>, details: impl Into<String>) -> Error {
    Error::configuration_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(field)
            .with_details(details)
            .with_source("config"),
    )
}

use super::driver::ChainOptimizer;
use crate::cache::{CacheBackend, MemoryCache, ResponseCache};
use crate::config::OptimizerConfig;
use crate::events::EventSink;
use crate::fingerprint::Normalizer;
use crate::prefetch::PrefetchCoordinator;
use crate::routing::TransitionModel;
use crate::transport::{AgentTransport, NoopPreloader, PreloadTransport};
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Builder for [`ChainOptimizer`].
///
/// Only the agent transport is required. Everything else falls back to an
/// in-process default: a bounded [`MemoryCache`], a fresh transition model,
/// a preloader that does nothing and a no-op event sink.
pub struct ChainOptimizerBuilder {
    config: OptimizerConfig,
    backend: Option<Arc<dyn CacheBackend>>,
    transport: Option<Arc<dyn AgentTransport>>,
    preloader: Arc<dyn PreloadTransport>,
    events: Arc<dyn EventSink>,
    model: Option<Arc<TransitionModel>>,
    salt: Option<String>,
    max_inflight: Option<usize>,
}

impl ChainOptimizerBuilder {
    pub fn new() -> Self {
        Self {
            config: OptimizerConfig::default(),
            backend: None,
            transport: None,
            preloader: Arc::new(NoopPreloader),
            events: crate::events::noop_sink(),
            model: None,
            salt: None,
            max_inflight: None,
        }
    }

    pub fn config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Cache store. Default is an in-process LRU store.
    pub fn cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn AgentTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn preloader(mut self, preloader: Arc<dyn PreloadTransport>) -> Self {
        self.preloader = preloader;
        self
    }

    /// Inject an event sink. Default is a no-op sink.
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Share a transition model between optimizers, or seed one from traces.
    pub fn transition_model(mut self, model: Arc<TransitionModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Namespace cache keys, e.g. per agent-version deployment.
    pub fn key_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    /// Limit the number of chains running at once.
    pub fn max_inflight(mut self, n: usize) -> Self {
        self.max_inflight = Some(n.max(1));
        self
    }

    pub fn build(self) -> Result<ChainOptimizer> {
        self.config.validate()?;
        let transport = self.transport.ok_or_else(|| {
            Error::configuration_with_context(
                "an agent transport is required",
                ErrorContext::new()
                    .with_field_path("transport")
                    .with_source("chain_optimizer_builder"),
            )
        })?;

        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(MemoryCache::default()));
        let cache = Arc::new(ResponseCache::new(self.config.cache.clone(), backend));
        let model = self.model.unwrap_or_default();

        let mut normalizer = Normalizer::new();
        if let Some(salt) = self.salt {
            normalizer = normalizer.with_salt(salt);
        }
        let coordinator = PrefetchCoordinator::new(
            Arc::clone(&cache),
            Arc::clone(&model),
            transport,
            self.preloader,
            self.events,
            self.config.prefetch.clone(),
        )
        .with_normalizer(normalizer);

        let inflight = self.max_inflight.map(|n| Arc::new(Semaphore::new(n)));

        Ok(ChainOptimizer {
            coordinator,
            cache,
            model,
            config: self.config,
            inflight,
        })
    }
}

impl Default for ChainOptimizerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Per-hop coordination of cache, invocation and speculative preload.

use super::preload::{PreloadHandle, PreloadOutcome};
use crate::cache::ResponseCache;
use crate::events::{AbandonReason, EventKind, EventSink, HopEvent, HopSource};
use crate::fingerprint::{CacheKey, Normalizer};
use crate::routing::{Prediction, TransitionModel};
use crate::transport::{AgentTransport, Invocation, PreloadTransport, TransportError, WarmHandle};
use crate::types::{AgentId, AgentResponse, Context, Payload};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Master switch for speculative preloading. Caching is unaffected.
    pub enabled: bool,
    /// Minimum prediction confidence, in `[0, 1]`, that triggers a preload.
    pub confidence_threshold: f64,
    /// Minimum number of observed transitions out of the current agent.
    pub min_support: u64,
    /// Upper bound on a single real invocation.
    pub invoke_deadline: Duration,
    /// How long the next hop waits for a still-running preload of the right
    /// agent before starting cold. Also extends the preload's lifetime past
    /// the invocation deadline.
    pub preload_grace: Duration,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence_threshold: 0.7,
            min_support: 1,
            invoke_deadline: Duration::from_secs(60),
            preload_grace: Duration::from_millis(500),
        }
    }
}

impl PrefetchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_min_support(mut self, support: u64) -> Self {
        self.min_support = support;
        self
    }

    pub fn with_invoke_deadline(mut self, deadline: Duration) -> Self {
        self.invoke_deadline = deadline;
        self
    }

    pub fn with_preload_grace(mut self, grace: Duration) -> Self {
        self.preload_grace = grace;
        self
    }

    /// Whether a prediction is strong enough to act on.
    pub fn admits(&self, prediction: &Prediction) -> bool {
        prediction.confidence >= self.confidence_threshold && prediction.support >= self.min_support
    }

    fn preload_lifetime(&self) -> Duration {
        self.invoke_deadline + self.preload_grace
    }
}

/// Input of one hop.
#[derive(Debug)]
pub struct HopRequest<'a> {
    pub hop: usize,
    pub agent: &'a AgentId,
    /// The chain's real next agent. `None` on the last hop.
    pub next_agent: Option<&'a AgentId>,
    pub payload: &'a Payload,
    pub context: &'a Context,
    /// Preload started by the previous hop, if any.
    pub pending_preload: Option<PreloadHandle>,
}

/// Result of a successful hop.
#[derive(Debug)]
pub struct HopOutcome {
    pub response: AgentResponse,
    pub source: HopSource,
    pub key: CacheKey,
    pub latency: Duration,
    /// True when the invocation ran on a context warmed by a preload.
    pub warm_start: bool,
    /// Preload of the predicted next agent, still owned by the caller.
    pub preload: Option<PreloadHandle>,
}

/// Runs one hop: `CHECK_CACHE`, then on a miss the real invocation with an
/// optional speculative preload of the predicted next agent alongside it.
///
/// The pending preload from the previous hop is only claimed on a miss; a
/// hit drops it. Store outages degrade to a miss; preload problems only ever
/// show up as events.
pub struct PrefetchCoordinator {
    normalizer: Normalizer,
    cache: Arc<ResponseCache>,
    model: Arc<TransitionModel>,
    transport: Arc<dyn AgentTransport>,
    preloader: Arc<dyn PreloadTransport>,
    events: Arc<dyn EventSink>,
    config: PrefetchConfig,
}

impl PrefetchCoordinator {
    pub fn new(
        cache: Arc<ResponseCache>,
        model: Arc<TransitionModel>,
        transport: Arc<dyn AgentTransport>,
        preloader: Arc<dyn PreloadTransport>,
        events: Arc<dyn EventSink>,
        config: PrefetchConfig,
    ) -> Self {
        Self {
            normalizer: Normalizer::new(),
            cache,
            model,
            transport,
            preloader,
            events,
            config,
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn config(&self) -> &PrefetchConfig {
        &self.config
    }

    pub async fn execute_hop(&self, request: HopRequest<'_>) -> Result<HopOutcome> {
        let started = Instant::now();
        let HopRequest {
            hop,
            agent,
            next_agent,
            payload,
            context,
            pending_preload,
        } = request;
        let session = context.session_id.as_str();

        let key = self.normalizer.normalize(agent, payload, context);
        let mut store_reachable = true;
        match self.cache.get::<AgentResponse>(&key).await {
            Ok(Some(response)) => {
                self.emit(session, hop, agent, EventKind::CacheHit { key: key.to_hex() }).await;
                if let Some(handle) = pending_preload {
                    let reason = if handle.target() == agent {
                        AbandonReason::ServedFromCache
                    } else {
                        AbandonReason::Mispredicted
                    };
                    self.abandon_preload(session, hop, agent, handle, reason).await;
                }
                if let Some(next) = next_agent {
                    self.model.observe(agent, next);
                }
                let latency = started.elapsed();
                self.emit(session, hop, agent, completed(HopSource::Cache, latency)).await;
                return Ok(HopOutcome {
                    response,
                    source: HopSource::Cache,
                    key,
                    latency,
                    warm_start: false,
                    preload: None,
                });
            }
            Ok(None) => {
                self.emit(session, hop, agent, EventKind::CacheMiss { key: key.to_hex() }).await;
            }
            Err(e) => {
                warn!(agent = %agent, hop, error = %e, "cache store unavailable; treating as miss");
                store_reachable = false;
                self.emit(session, hop, agent, EventKind::CacheUnavailable { reason: e.to_string() })
                    .await;
            }
        }

        let warm = match pending_preload {
            Some(handle) => self.claim_preload(session, hop, agent, handle).await,
            None => None,
        };

        let (preload, predicted) = match next_agent {
            Some(_) => self.maybe_preload(session, hop, agent, context).await,
            None => (None, None),
        };

        let deadline = self.config.invoke_deadline;
        let call = Invocation {
            agent,
            payload,
            context,
            deadline,
            warm: warm.as_ref(),
        };
        let result = match tokio::time::timeout(deadline, self.transport.invoke(call)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::DeadlineExceeded(deadline)),
        };
        let response = match result {
            Ok(response) => response,
            Err(source) => {
                warn!(agent = %agent, hop, error = %source, "agent invocation failed");
                self.emit(session, hop, agent, EventKind::InvocationFailed { reason: source.to_string() })
                    .await;
                if let Some(handle) = preload {
                    self.abandon_preload(session, hop, agent, handle, AbandonReason::HopFailed)
                        .await;
                }
                return Err(Error::InvocationFailed {
                    hop,
                    agent: agent.clone(),
                    source,
                });
            }
        };

        if store_reachable {
            if let Err(e) = self.cache.put(&key, &response, None).await {
                warn!(agent = %agent, hop, error = %e, "failed to cache agent response");
                self.emit(session, hop, agent, EventKind::CacheUnavailable { reason: e.to_string() })
                    .await;
            }
        }

        if let Some(next) = next_agent {
            self.model.observe(agent, next);
            if let Some(predicted) = predicted {
                let correct = &predicted == next;
                debug!(agent = %agent, predicted = %predicted, actual = %next, correct, "prediction resolved");
                self.emit(
                    session,
                    hop,
                    agent,
                    EventKind::PredictionResolved {
                        predicted,
                        actual: next.clone(),
                        correct,
                    },
                )
                .await;
            }
        }

        let latency = started.elapsed();
        self.emit(session, hop, agent, completed(HopSource::Invocation, latency)).await;
        Ok(HopOutcome {
            response,
            source: HopSource::Invocation,
            key,
            latency,
            warm_start: warm.is_some(),
            preload,
        })
    }

    async fn maybe_preload(
        &self,
        session: &str,
        hop: usize,
        agent: &AgentId,
        context: &Context,
    ) -> (Option<PreloadHandle>, Option<AgentId>) {
        if !self.config.enabled {
            return (None, None);
        }
        match self.model.predict(agent) {
            Some(prediction) if self.config.admits(&prediction) => {
                info!(
                    agent = %agent,
                    predicted = %prediction.agent,
                    confidence = prediction.confidence,
                    "preloading predicted next agent"
                );
                let handle = PreloadHandle::spawn(
                    Arc::clone(&self.preloader),
                    prediction.agent.clone(),
                    context.clone(),
                    self.config.preload_lifetime(),
                );
                let target = prediction.agent.clone();
                self.emit(
                    session,
                    hop,
                    agent,
                    EventKind::PredictionMade {
                        predicted: prediction.agent,
                        confidence: prediction.confidence,
                        support: prediction.support,
                    },
                )
                .await;
                self.emit(session, hop, agent, EventKind::PreloadStarted { target: target.clone() })
                    .await;
                (Some(handle), Some(target))
            }
            Some(prediction) => {
                debug!(
                    agent = %agent,
                    candidate = %prediction.agent,
                    confidence = prediction.confidence,
                    threshold = self.config.confidence_threshold,
                    "prediction below threshold"
                );
                self.emit(
                    session,
                    hop,
                    agent,
                    EventKind::PredictionSkipped {
                        candidate: Some(prediction.agent),
                        confidence: Some(prediction.confidence),
                    },
                )
                .await;
                (None, None)
            }
            None => {
                self.emit(
                    session,
                    hop,
                    agent,
                    EventKind::PredictionSkipped {
                        candidate: None,
                        confidence: None,
                    },
                )
                .await;
                (None, None)
            }
        }
    }

    async fn claim_preload(
        &self,
        session: &str,
        hop: usize,
        agent: &AgentId,
        handle: PreloadHandle,
    ) -> Option<WarmHandle> {
        let target = handle.target().clone();
        match handle.claim(agent, self.config.preload_grace).await {
            PreloadOutcome::Warm(warm) => {
                debug!(agent = %agent, "starting on preloaded context");
                self.emit(session, hop, agent, EventKind::PreloadConsumed { target }).await;
                Some(warm)
            }
            PreloadOutcome::Failed(e) => {
                debug!(agent = %agent, target = %target, error = %e, "preload failed");
                self.emit(
                    session,
                    hop,
                    agent,
                    EventKind::PreloadFailed {
                        target,
                        reason: e.to_string(),
                    },
                )
                .await;
                None
            }
            PreloadOutcome::Abandoned(reason) => {
                debug!(agent = %agent, target = %target, ?reason, "preload abandoned");
                self.emit(session, hop, agent, EventKind::PreloadAbandoned { target, reason })
                    .await;
                None
            }
        }
    }

    /// Drops `handle`, aborting its task, and reports why.
    async fn abandon_preload(
        &self,
        session: &str,
        hop: usize,
        agent: &AgentId,
        handle: PreloadHandle,
        reason: AbandonReason,
    ) {
        let target = handle.target().clone();
        drop(handle);
        debug!(agent = %agent, target = %target, ?reason, "preload abandoned");
        self.emit(session, hop, agent, EventKind::PreloadAbandoned { target, reason })
            .await;
    }

    async fn emit(&self, session: &str, hop: usize, agent: &AgentId, kind: EventKind) {
        let event = HopEvent::new(session, hop, agent.clone(), kind);
        if let Err(e) = self.events.emit(event).await {
            debug!(agent = %agent, hop, error = %e, "event sink rejected event");
        }
    }
}

fn completed(source: HopSource, latency: Duration) -> EventKind {
    EventKind::HopCompleted {
        source,
        latency_ms: latency.as_secs_f64() * 1000.0,
    }
}

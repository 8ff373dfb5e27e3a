use super::report::{ChainReport, HopRecord};
use crate::cache::{CacheStats, ResponseCache};
use crate::config::OptimizerConfig;
use crate::prefetch::{HopRequest, PrefetchCoordinator};
use crate::routing::{TransitionModel, TransitionStats};
use crate::types::{AgentId, AgentResponse, Context, Payload, Turn, INPUT_TEXT_KEY};
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info};

/// Result of a successful chain run: one record per hop, in order.
///
/// Only [`ChainOptimizer::run_chain`] builds one, and it rejects empty
/// chains, so a run always has at least one hop.
#[derive(Debug, Clone)]
pub struct ChainRun {
    pub(crate) session_id: String,
    pub(crate) hops: Vec<HopRecord>,
}

impl ChainRun {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn hops(&self) -> &[HopRecord] {
        &self.hops
    }

    /// Response of the last hop.
    pub fn final_response(&self) -> Option<&AgentResponse> {
        self.hops.last().map(|record| &record.response)
    }

    pub fn total_latency(&self) -> Duration {
        self.hops.iter().map(|h| h.latency).sum()
    }

    pub fn cache_hits(&self) -> usize {
        self.hops.iter().filter(|h| h.from_cache()).count()
    }
}

/// Runs ordered agent chains through the prefetch coordinator.
///
/// Each hop's output becomes the next hop's `input_text` and is appended to
/// the shared context. The first failing hop ends the run; no partial result
/// is returned. A `ChainOptimizer` can serve many chains concurrently.
pub struct ChainOptimizer {
    pub(crate) coordinator: PrefetchCoordinator,
    pub(crate) cache: Arc<ResponseCache>,
    pub(crate) model: Arc<TransitionModel>,
    pub(crate) config: OptimizerConfig,
    pub(crate) inflight: Option<Arc<Semaphore>>,
}

impl ChainOptimizer {
    /// Runs the chain configured in [`OptimizerConfig::agent_ids`].
    pub async fn run(&self, initial_input: &str) -> Result<ChainRun> {
        self.run_chain(&self.config.agent_ids, initial_input).await
    }

    pub async fn run_chain(&self, agent_ids: &[AgentId], initial_input: &str) -> Result<ChainRun> {
        if agent_ids.is_empty() {
            return Err(Error::validation_with_context(
                "agent chain is empty",
                ErrorContext::new()
                    .with_field_path("agent_ids")
                    .with_source("pipeline_driver"),
            ));
        }

        let _permit = match &self.inflight {
            Some(sem) => Some(sem.clone().acquire_owned().await.map_err(|_| {
                Error::runtime_with_context(
                    "inflight semaphore closed",
                    ErrorContext::new().with_source("pipeline_driver"),
                )
            })?),
            None => None,
        };

        let session_id = format!("chain-{}", uuid::Uuid::new_v4());
        let mut context = Context::new(session_id.clone());
        let mut input = initial_input.to_string();
        let mut hops = Vec::with_capacity(agent_ids.len());
        let mut pending_preload = None;

        for (i, agent) in agent_ids.iter().enumerate() {
            let payload = Payload::new().with(INPUT_TEXT_KEY, input.as_str());
            let request = HopRequest {
                hop: i,
                agent,
                next_agent: agent_ids.get(i + 1),
                payload: &payload,
                context: &context,
                pending_preload: pending_preload.take(),
            };
            let mut outcome = match self.coordinator.execute_hop(request).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(session = %session_id, hop = i, agent = %agent, error = %e, "chain aborted");
                    return Err(e);
                }
            };
            pending_preload = outcome.preload.take();

            input = outcome.response.output.clone();
            context.push(Turn::new(agent.clone(), input.as_str()));
            context.truncate_front(self.config.max_context_turns);

            hops.push(HopRecord {
                hop: i,
                agent: agent.clone(),
                source: outcome.source,
                latency: outcome.latency,
                warm_start: outcome.warm_start,
                response: outcome.response,
            });
        }

        let run = ChainRun { session_id, hops };
        info!(
            session = %run.session_id,
            hops = run.hops.len(),
            cache_hits = run.cache_hits(),
            total_ms = run.total_latency().as_millis() as u64,
            "chain completed"
        );
        Ok(run)
    }

    /// Summary of a run together with the optimizer's cache and router state.
    pub fn report(&self, run: &ChainRun) -> ChainReport {
        ChainReport::new(run, self.cache.stats(), self.model.stats())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn transition_stats(&self) -> TransitionStats {
        self.model.stats()
    }

    /// Shared transition model, e.g. for seeding with historical traces.
    pub fn transition_model(&self) -> &Arc<TransitionModel> {
        &self.model
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

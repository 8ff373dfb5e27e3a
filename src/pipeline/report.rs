//! Per-run records and summary reports.

use super::driver::ChainRun;
use crate::cache::CacheStats;
use crate::events::HopSource;
use crate::routing::TransitionStats;
use crate::types::{AgentId, AgentResponse};
use serde::Serialize;
use std::time::Duration;

/// Outcome of one hop within a chain run.
#[derive(Debug, Clone)]
pub struct HopRecord {
    pub hop: usize,
    pub agent: AgentId,
    pub source: HopSource,
    pub latency: Duration,
    pub warm_start: bool,
    pub response: AgentResponse,
}

impl HopRecord {
    pub fn from_cache(&self) -> bool {
        self.source == HopSource::Cache
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentLatency {
    pub agent: AgentId,
    pub latency_ms: f64,
    pub source: HopSource,
    pub warm_start: bool,
}

/// Serializable summary of a chain run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainReport {
    pub session_id: String,
    pub total_latency_ms: f64,
    pub per_agent: Vec<AgentLatency>,
    pub cache: CacheReport,
    pub router: TransitionStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheReport {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub hit_rate: f64,
}

impl ChainReport {
    pub fn new(run: &ChainRun, cache: CacheStats, router: TransitionStats) -> Self {
        Self {
            session_id: run.session_id.clone(),
            total_latency_ms: round1(millis(run.total_latency())),
            per_agent: run
                .hops
                .iter()
                .map(|h| AgentLatency {
                    agent: h.agent.clone(),
                    latency_ms: round1(millis(h.latency)),
                    source: h.source,
                    warm_start: h.warm_start,
                })
                .collect(),
            cache: CacheReport {
                hits: cache.hits,
                misses: cache.misses,
                errors: cache.errors,
                hit_rate: (cache.hit_ratio() * 1000.0).round() / 1000.0,
            },
            router,
        }
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hop: usize, agent: &str, ms: u64, source: HopSource) -> HopRecord {
        HopRecord {
            hop,
            agent: AgentId::from(agent),
            source,
            latency: Duration::from_millis(ms),
            warm_start: false,
            response: AgentResponse::new(agent, format!("out-{}", hop)),
        }
    }

    #[test]
    fn test_report_summarises_run() {
        let run = ChainRun {
            session_id: "chain-1".into(),
            hops: vec![
                record(0, "classifier", 120, HopSource::Invocation),
                record(1, "retriever", 3, HopSource::Cache),
            ],
        };
        let cache = CacheStats { hits: 1, misses: 2, sets: 2, errors: 0 };
        let router = TransitionStats {
            total_observations: 1,
            known_agents: vec![AgentId::from("classifier")],
            transition_pairs: 1,
        };
        let report = ChainReport::new(&run, cache, router);

        assert_eq!(report.total_latency_ms, 123.0);
        assert_eq!(report.per_agent.len(), 2);
        assert_eq!(report.per_agent[1].source, HopSource::Cache);
        assert_eq!(report.cache.hit_rate, 0.333);
        assert_eq!(run.cache_hits(), 1);
        assert_eq!(run.final_response().unwrap().output, "out-1");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["per_agent"][0]["agent"], "classifier");
        assert_eq!(json["per_agent"][1]["source"], "cache");
        assert_eq!(json["router"]["transition_pairs"], 1);
    }

    #[test]
    fn test_empty_run_has_no_final_response() {
        let run = ChainRun {
            session_id: "chain-0".into(),
            hops: Vec::new(),
        };
        assert!(run.final_response().is_none());
        assert_eq!(run.total_latency(), Duration::ZERO);
        assert_eq!(run.session_id(), "chain-0");
    }
}

use crate::types::AgentId;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Most likely successor of an agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub agent: AgentId,
    /// `count(from -> agent) / count(from -> *)`, in `[0, 1]`.
    pub confidence: f64,
    /// Total observed transitions out of the source agent.
    pub support: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionStats {
    pub total_observations: u64,
    pub known_agents: Vec<AgentId>,
    pub transition_pairs: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct Successor {
    count: u64,
    /// Logical clock value of the latest observation, for recency tie-breaks.
    last_seen: u64,
}

#[derive(Debug, Default)]
struct Table {
    edges: HashMap<AgentId, HashMap<AgentId, Successor>>,
    clock: u64,
}

/// Frequency table of observed agent transitions.
///
/// All updates happen under one mutex, so concurrent `observe` calls never
/// lose increments.
#[derive(Debug, Default)]
pub struct TransitionModel {
    table: Mutex<Table>,
}

impl TransitionModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one observed `from -> to` transition.
    pub fn observe(&self, from: &AgentId, to: &AgentId) {
        let mut table = self.lock();
        table.clock += 1;
        let now = table.clock;
        let successor = table
            .edges
            .entry(from.clone())
            .or_default()
            .entry(to.clone())
            .or_default();
        successor.count += 1;
        successor.last_seen = now;
    }

    /// Records every consecutive pair of a full chain trace.
    pub fn ingest_trace(&self, agents: &[AgentId]) {
        for pair in agents.windows(2) {
            self.observe(&pair[0], &pair[1]);
        }
    }

    /// Most likely successor of `from`, or `None` without history.
    ///
    /// Equal counts go to the most recently observed successor, then to the
    /// lexicographically smallest agent id.
    pub fn predict(&self, from: &AgentId) -> Option<Prediction> {
        let table = self.lock();
        let successors = table.edges.get(from)?;
        let total: u64 = successors.values().map(|s| s.count).sum();
        if total == 0 {
            return None;
        }
        let (agent, best) = successors.iter().max_by(|(a_id, a), (b_id, b)| {
            a.count
                .cmp(&b.count)
                .then(a.last_seen.cmp(&b.last_seen))
                .then_with(|| b_id.cmp(a_id))
        })?;
        Some(Prediction {
            agent: agent.clone(),
            confidence: best.count as f64 / total as f64,
            support: total,
        })
    }

    pub fn count(&self, from: &AgentId, to: &AgentId) -> u64 {
        self.lock()
            .edges
            .get(from)
            .and_then(|s| s.get(to))
            .map(|s| s.count)
            .unwrap_or(0)
    }

    pub fn stats(&self) -> TransitionStats {
        let table = self.lock();
        let mut known_agents: Vec<AgentId> = table.edges.keys().cloned().collect();
        known_agents.sort();
        TransitionStats {
            total_observations: table.clock,
            known_agents,
            transition_pairs: table.edges.values().map(HashMap::len).sum(),
        }
    }
}

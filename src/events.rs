//! 核心事件类型：提供 EventSink trait 和逐跳可观测事件（始终编译）。
//!
//! Core observability types (always compiled).
//!
//! The coordinator emits one [`HopEvent`] per notable step of a hop (cache
//! hit/miss, prediction made, prediction correct/incorrect, preload outcome).
//! It never formats or ships them anywhere; that is the job of an
//! [`EventSink`]. Extra sinks live in [`crate::telemetry`].

use crate::types::AgentId;
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

fn timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Where a hop's response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HopSource {
    Cache,
    Invocation,
}

/// Why a speculative preload was dropped without being used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonReason {
    /// The chain's real next agent differs from the preloaded one.
    Mispredicted,
    /// The preload had not finished within the grace period.
    NotReady,
    /// The next hop was answered from the cache, so no warm start was needed.
    ServedFromCache,
    /// The hop that started the preload failed.
    HopFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    CacheHit { key: String },
    CacheMiss { key: String },
    CacheUnavailable { reason: String },
    PredictionMade { predicted: AgentId, confidence: f64, support: u64 },
    /// No history, or the best candidate did not clear the threshold.
    PredictionSkipped { candidate: Option<AgentId>, confidence: Option<f64> },
    PredictionResolved { predicted: AgentId, actual: AgentId, correct: bool },
    PreloadStarted { target: AgentId },
    PreloadConsumed { target: AgentId },
    PreloadFailed { target: AgentId, reason: String },
    PreloadAbandoned { target: AgentId, reason: AbandonReason },
    InvocationFailed { reason: String },
    HopCompleted { source: HopSource, latency_ms: f64 },
}

/// A structured event tied to one hop of one chain run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HopEvent {
    pub session_id: String,
    pub hop: usize,
    pub agent: AgentId,
    pub kind: EventKind,
    pub timestamp: f64,
}

impl HopEvent {
    pub fn new(session_id: impl Into<String>, hop: usize, agent: AgentId, kind: EventKind) -> Self {
        Self {
            session_id: session_id.into(),
            hop,
            agent,
            kind,
            timestamp: timestamp(),
        }
    }

    /// Stable snake_case name of the event kind.
    pub fn name(&self) -> &'static str {
        match &self.kind {
            EventKind::CacheHit { .. } => "cache_hit",
            EventKind::CacheMiss { .. } => "cache_miss",
            EventKind::CacheUnavailable { .. } => "cache_unavailable",
            EventKind::PredictionMade { .. } => "prediction_made",
            EventKind::PredictionSkipped { .. } => "prediction_skipped",
            EventKind::PredictionResolved { .. } => "prediction_resolved",
            EventKind::PreloadStarted { .. } => "preload_started",
            EventKind::PreloadConsumed { .. } => "preload_consumed",
            EventKind::PreloadFailed { .. } => "preload_failed",
            EventKind::PreloadAbandoned { .. } => "preload_abandoned",
            EventKind::InvocationFailed { .. } => "invocation_failed",
            EventKind::HopCompleted { .. } => "hop_completed",
        }
    }
}

/// Event sink trait.
///
/// Events are emitted inline on the hop's path, so `emit` must return
/// promptly. Sinks that ship events somewhere slow should buffer or hand
/// them off to their own task. Errors are logged and otherwise ignored.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: HopEvent) -> Result<()>;
    async fn emit_batch(&self, events: Vec<HopEvent>) -> Result<()> {
        for e in events {
            self.emit(e).await?;
        }
        Ok(())
    }
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// No-op sink (always available).
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn emit(&self, _: HopEvent) -> Result<()> {
        Ok(())
    }
}

/// Returns a no-op event sink.
pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoopEventSink)
}

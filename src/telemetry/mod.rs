//! 遥测模块：逐跳事件的可选接收端（内存、tracing 日志、组合）。
//!
//! Telemetry sinks for hop events.
//!
//! The runtime never forces collection: the default sink is a no-op. These
//! sinks let applications capture, log, or fan out [`HopEvent`]s.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`HopEvent`] | Structured per-hop event |
//! | [`EventSink`] | Trait for event destinations |
//! | [`NoopEventSink`] | Default no-op sink |
//! | [`InMemoryEventSink`] | Bounded in-memory sink, mostly for tests |
//! | [`TracingEventSink`] | Forwards events to `tracing` |
//! | [`CompositeEventSink`] | Multi-destination composite sink |

pub use crate::events::{
    noop_sink, AbandonReason, EventKind, EventSink, HopEvent, HopSource, NoopEventSink,
};

use crate::Result;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// In-memory sink for testing.
pub struct InMemoryEventSink {
    events: Arc<RwLock<Vec<HopEvent>>>,
    max_events: usize,
}
impl InMemoryEventSink {
    pub fn new(max: usize) -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            max_events: max,
        }
    }
    pub fn events(&self) -> Vec<HopEvent> {
        match self.events.read() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
    pub fn events_for_session(&self, session_id: &str) -> Vec<HopEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.session_id == session_id)
            .collect()
    }
    /// Number of captured events with the given [`HopEvent::name`].
    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name() == name).count()
    }
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }
    pub fn len(&self) -> usize {
        self.events().len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl Default for InMemoryEventSink {
    fn default() -> Self {
        Self::new(10_000)
    }
}
#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn emit(&self, event: HopEvent) -> Result<()> {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
            if events.len() > self.max_events {
                events.remove(0);
            }
        }
        Ok(())
    }
}

/// Sink that logs every event through `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: HopEvent) -> Result<()> {
        tracing::debug!(
            target: "agent_prefetch::events",
            session = %event.session_id,
            hop = event.hop,
            agent = %event.agent,
            event = event.name(),
            detail = ?event.kind,
        );
        Ok(())
    }
}

/// Composite sink for multiple destinations.
pub struct CompositeEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}
impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }
    pub fn add_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}
impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}
#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: HopEvent) -> Result<()> {
        for s in &self.sinks {
            let _ = s.emit(event.clone()).await;
        }
        Ok(())
    }
    async fn close(&self) -> Result<()> {
        for s in &self.sinks {
            let _ = s.close().await;
        }
        Ok(())
    }
}

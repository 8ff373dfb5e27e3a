//! Shared fakes for the chain integration tests.

#![allow(dead_code)]

use agent_prefetch::cache::{CacheBackend, StoreError, StoreResult};
use agent_prefetch::transport::{AgentTransport, Invocation, PreloadTransport, TransportError, WarmHandle};
use agent_prefetch::types::{AgentId, AgentResponse, Context};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn chain(ids: &[&str]) -> Vec<AgentId> {
    ids.iter().map(|s| AgentId::from(*s)).collect()
}

/// One real agent call as seen by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub agent: AgentId,
    pub started: Instant,
    pub finished: Instant,
    pub warm: bool,
}

/// Deterministic agents: `agent(input)`, after a fixed delay.
#[derive(Default)]
pub struct ScriptedTransport {
    pub delay: Duration,
    pub failing: Option<AgentId>,
    calls: Mutex<Vec<CallRecord>>,
}

impl ScriptedTransport {
    pub fn with_delay(ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(ms),
            ..Default::default()
        }
    }

    pub fn failing_at(mut self, agent: &str) -> Self {
        self.failing = Some(AgentId::from(agent));
        self
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AgentTransport for ScriptedTransport {
    async fn invoke(&self, call: Invocation<'_>) -> Result<AgentResponse, TransportError> {
        let started = Instant::now();
        tokio::time::sleep(self.delay).await;
        self.calls.lock().unwrap().push(CallRecord {
            agent: call.agent.clone(),
            started,
            finished: Instant::now(),
            warm: call.warm.is_some(),
        });
        if self.failing.as_ref() == Some(call.agent) {
            return Err(TransportError::Failed(format!("{} is throttled", call.agent)));
        }
        let input = call.payload.input_text().unwrap_or_default();
        Ok(AgentResponse::new(call.agent.clone(), format!("{}({})", call.agent, input)))
    }
}

/// Records when each preload started; optionally slow.
#[derive(Default)]
pub struct RecordingPreloader {
    pub delay: Duration,
    started: Mutex<Vec<(AgentId, Instant)>>,
}

impl RecordingPreloader {
    pub fn with_delay(ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(ms),
            ..Default::default()
        }
    }

    pub fn started(&self) -> Vec<(AgentId, Instant)> {
        self.started.lock().unwrap().clone()
    }

    pub fn targets(&self) -> Vec<AgentId> {
        self.started().into_iter().map(|(a, _)| a).collect()
    }
}

#[async_trait]
impl PreloadTransport for RecordingPreloader {
    async fn preload(&self, agent: &AgentId, context: &Context) -> Result<WarmHandle, TransportError> {
        self.started.lock().unwrap().push((agent.clone(), Instant::now()));
        tokio::time::sleep(self.delay).await;
        Ok(WarmHandle::new(agent.clone()).with_session(context.session_id.clone()))
    }
}

/// A store that refuses every connection.
#[derive(Default)]
pub struct UnreachableStore {
    pub attempts: AtomicUsize,
}

impl UnreachableStore {
    fn refuse<T>(&self) -> StoreResult<T> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unreachable("connection refused".into()))
    }
}

#[async_trait]
impl CacheBackend for UnreachableStore {
    async fn get(&self, _: &[u8]) -> StoreResult<Option<Bytes>> {
        self.refuse()
    }
    async fn set(&self, _: &[u8], _: Bytes, _: Duration) -> StoreResult<()> {
        self.refuse()
    }
    async fn delete(&self, _: &[u8]) -> StoreResult<bool> {
        self.refuse()
    }
    async fn exists(&self, _: &[u8]) -> StoreResult<bool> {
        self.refuse()
    }
    async fn clear(&self) -> StoreResult<()> {
        self.refuse()
    }
    async fn len(&self) -> StoreResult<usize> {
        self.refuse()
    }
    fn name(&self) -> &'static str {
        "unreachable"
    }
}

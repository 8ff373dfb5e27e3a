//! 传输层模块：代理调用与上下文预热的外部接口。
//!
//! # Transport Module
//!
//! The core never talks to agents directly. Hosts plug in two transports:
//!
//! | Trait | Description |
//! |-------|-------------|
//! | [`AgentTransport`] | The real, critical-path agent invocation |
//! | [`PreloadTransport`] | Best-effort speculative warm-up of an agent's context |
//!
//! Timeout and retry policy belong to the transport. The coordinator only
//! bounds each call by the configured deadline.

use crate::types::{AgentId, AgentResponse, Context, Payload};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Agent call failed: {0}")]
    Failed(String),

    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("Agent unavailable: {0}")]
    Unavailable(String),
}

/// Result of a completed preload: whatever the transport needs to resume
/// the warmed execution state on the real call.
#[derive(Debug, Clone, PartialEq)]
pub struct WarmHandle {
    pub agent_id: AgentId,
    pub session_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl WarmHandle {
    pub fn new(agent_id: impl Into<AgentId>) -> Self {
        Self {
            agent_id: agent_id.into(),
            session_id: None,
            metadata: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// One real agent call.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub agent: &'a AgentId,
    pub payload: &'a Payload,
    pub context: &'a Context,
    pub deadline: Duration,
    /// Warm context left by a successful preload of this agent, if any.
    pub warm: Option<&'a WarmHandle>,
}

#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn invoke(&self, call: Invocation<'_>) -> Result<AgentResponse, TransportError>;
}

#[async_trait]
pub trait PreloadTransport: Send + Sync {
    async fn preload(&self, agent: &AgentId, context: &Context) -> Result<WarmHandle, TransportError>;
}

/// Preload transport for hosts without a warm-up path. Resolves immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPreloader;

#[async_trait]
impl PreloadTransport for NoopPreloader {
    async fn preload(&self, agent: &AgentId, _: &Context) -> Result<WarmHandle, TransportError> {
        Ok(WarmHandle::new(agent.clone()))
    }
}

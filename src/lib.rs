//! # agent-prefetch
//!
//! 多代理链路延迟隐藏中间件：响应缓存、转移预测与推测性预热。
//!
//! Latency-hiding middleware for sequential multi-agent chains.
//!
//! ## Overview
//!
//! A chain runs agents one after another, each consuming the previous output.
//! This crate sits between the chain and the agents and hides latency two
//! ways:
//!
//! - **Response caching**: a semantically identical request (same agent, same
//!   normalized payload and context) is answered from a shared store.
//! - **Speculative preload**: while one agent runs, the next agent is
//!   predicted from observed transitions and, when the prediction is confident
//!   enough, warmed up concurrently.
//!
//! Neither may change results. A store outage degrades to a miss, and a
//! wrong or failed preload is discarded without delaying the chain.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agent_prefetch::{ChainOptimizerBuilder, OptimizerConfig};
//! use agent_prefetch::transport::{AgentTransport, Invocation, TransportError};
//! use agent_prefetch::types::AgentResponse;
//! use std::sync::Arc;
//!
//! struct MyAgents;
//!
//! #[async_trait::async_trait]
//! impl AgentTransport for MyAgents {
//!     async fn invoke(&self, call: Invocation<'_>) -> Result<AgentResponse, TransportError> {
//!         Ok(AgentResponse::new(call.agent.clone(), "done"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> agent_prefetch::Result<()> {
//!     let optimizer = ChainOptimizerBuilder::new()
//!         .config(OptimizerConfig::new().with_agent_ids(["classifier", "retriever", "summarizer"]))
//!         .transport(Arc::new(MyAgents))
//!         .build()?;
//!
//!     let run = optimizer.run("doc1").await?;
//!     if let Some(response) = run.final_response() {
//!         println!("{}", response.output);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`fingerprint`] | Canonical request encoding and cache keys |
//! | [`cache`] | Response cache over pluggable stores |
//! | [`routing`] | Transition model and next-agent prediction |
//! | [`prefetch`] | Per-hop cache/invoke/preload coordination |
//! | [`pipeline`] | Chain driver, builder and run reports |
//! | [`transport`] | Agent invocation and preload seams |
//! | [`telemetry`] | Event sinks |
//! | [`types`] | Agent ids, payloads, context and responses |

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod fingerprint;
pub mod pipeline;
pub mod prefetch;
pub mod routing;
pub mod telemetry;
pub mod transport;
pub mod types;

pub use config::OptimizerConfig;
pub use events::{EventSink, HopEvent};
pub use pipeline::{ChainOptimizer, ChainOptimizerBuilder, ChainReport, ChainRun};
pub use types::{AgentId, AgentResponse, Context, Payload, Turn};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

pub use error::{Error, ErrorContext};

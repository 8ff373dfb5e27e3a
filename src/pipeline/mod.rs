//! 链式驱动模块：按顺序执行代理链，并在跳与跳之间传递输出、上下文与预热句柄。
//!
//! # Chain Driver Layer
//!
//! Runs an ordered chain of agents end to end. Each hop goes through the
//! [`PrefetchCoordinator`](crate::prefetch::PrefetchCoordinator); the driver
//! only threads state between hops:
//!
//! ```text
//! input ─▶ hop 0 ─output─▶ hop 1 ─output─▶ … ─▶ hop n-1 ─▶ ChainRun
//!            │   preload     ▲
//!            └───────────────┘
//! ```
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ChainOptimizer`] | Runs chains; safe to share across tasks |
//! | [`ChainOptimizerBuilder`] | Wires cache store, transports, sinks and config |
//! | [`ChainRun`] | Per-hop records of a completed run |
//! | [`ChainReport`] | Serializable latency and cache/router summary |
//!
//! ## Example
//!
//! ```rust,no_run
//! use agent_prefetch::pipeline::ChainOptimizerBuilder;
//! use agent_prefetch::config::OptimizerConfig;
//! # use agent_prefetch::transport::{AgentTransport, Invocation, TransportError};
//! # use agent_prefetch::types::AgentResponse;
//! # use std::sync::Arc;
//! # struct Echo;
//! # #[async_trait::async_trait]
//! # impl AgentTransport for Echo {
//! #     async fn invoke(&self, call: Invocation<'_>) -> Result<AgentResponse, TransportError> {
//! #         Ok(AgentResponse::new(call.agent.clone(), "ok"))
//! #     }
//! # }
//!
//! # async fn demo() -> agent_prefetch::Result<()> {
//! let optimizer = ChainOptimizerBuilder::new()
//!     .config(OptimizerConfig::new().with_agent_ids(["classifier", "retriever", "summarizer"]))
//!     .transport(Arc::new(Echo))
//!     .build()?;
//!
//! let run = optimizer.run("doc1").await?;
//! println!("{}", serde_json::to_string_pretty(&optimizer.report(&run))?);
//! # Ok(())
//! # }
//! ```

mod builder;
mod driver;
mod report;

pub use builder::ChainOptimizerBuilder;
pub use driver::{ChainOptimizer, ChainRun};
pub use report::{AgentLatency, CacheReport, ChainReport, HopRecord};

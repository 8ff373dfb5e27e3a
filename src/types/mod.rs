//! 类型系统模块：定义代理链中流转的核心数据类型。
//!
//! # Types Module
//!
//! Core values that flow through an agent chain: agent identifiers, request
//! payloads, conversation context and agent responses.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`AgentId`] | Opaque identifier of an externally invoked agent |
//! | [`AgentResponse`] | Output produced by one agent invocation |
//! | [`Payload`] | Key/value request body handed to an agent |
//! | [`Context`] | Ordered prior turns plus the chain's session id |
//! | [`Turn`] | A single prior agent output inside the context |
//!
//! ## Example
//!
//! ```rust
//! use agent_prefetch::types::{AgentId, Context, Payload, Turn};
//!
//! let payload = Payload::new().with("input_text", "doc1");
//! let mut context = Context::new("chain-1");
//! context.push(Turn::new("classifier", "category: finance"));
//!
//! assert_eq!(payload.input_text(), Some("doc1"));
//! assert_eq!(context.turns().len(), 1);
//! assert_eq!(AgentId::from("classifier").as_str(), "classifier");
//! ```

pub mod agent;
pub mod context;

pub use agent::{AgentId, AgentResponse};
pub use context::{Context, Payload, Turn, INPUT_TEXT_KEY};

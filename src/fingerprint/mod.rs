//! 指纹模块：把 (agent, payload, context) 规范化为与顺序无关的缓存键。
//!
//! # Fingerprint Module
//!
//! Turns an agent request into a canonical byte encoding and a fixed-size
//! SHA-256 digest used as the response cache key.
//!
//! ## Normalization rules
//!
//! - Payload keys are sorted lexicographically, at every nesting level
//! - String values have leading/trailing whitespace stripped
//! - Context turns keep their original order
//! - The chain's session id is not part of the fingerprint
//!
//! ## Example
//!
//! ```rust
//! use agent_prefetch::fingerprint::Normalizer;
//! use agent_prefetch::types::{AgentId, Context, Payload};
//!
//! let normalizer = Normalizer::new();
//! let ctx = Context::new("session-a");
//! let a = Payload::new().with("input_text", "doc1").with("lang", "en");
//! let b = Payload::new().with("lang", "en ").with("input_text", "  doc1");
//!
//! let agent = AgentId::from("classifier");
//! assert_eq!(normalizer.normalize(&agent, &a, &ctx), normalizer.normalize(&agent, &b, &ctx));
//! ```

mod canonical;
mod key;

pub use key::{CacheKey, Normalizer};

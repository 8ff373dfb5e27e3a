//! 预取协调模块：每一跳并发执行缓存查询、真实调用与推测性预热。
//!
//! # Prefetch Coordination Layer
//!
//! The per-hop state machine:
//!
//! ```text
//! CHECK_CACHE ──hit──────────────────────────────▶ CACHE_HIT
//!      │
//!     miss / store unavailable
//!      ▼
//! INVOKE_AND_MAYBE_PREFETCH ──ok──▶ INVOKE_OK (cached, transition observed)
//!      │        ╲
//!      │         ╲ spawn (confidence ≥ threshold)
//!      │          ▶ preload(predicted next agent) ── claimed by the next hop on a miss
//!      └──error──▶ INVOKE_FAILED
//! ```
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`PrefetchCoordinator`] | Executes one hop |
//! | [`PrefetchConfig`] | Threshold, support, deadline and grace settings |
//! | [`PreloadHandle`] | Abortable handle to a speculative warm-up |
//! | [`HopRequest`] / [`HopOutcome`] | Input and result of a hop |

mod coordinator;
mod preload;


pub use coordinator::{HopOutcome, HopRequest, PrefetchConfig, PrefetchCoordinator};
pub use preload::{PreloadHandle, PreloadOutcome};

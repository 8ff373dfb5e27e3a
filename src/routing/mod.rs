//! 预测路由模块：统计代理之间的转移频率并预测下一个代理。
//!
//! Predictive routing helpers.
//!
//! This module is intentionally **pure logic**: it performs no I/O. It keeps a
//! bigram frequency table of observed agent-to-agent transitions and answers
//! "which agent most likely runs after this one", with a confidence score.
//!
//! Design note:
//! - The model never forgets; there is no decay.
//! - The table is private. All access goes through [`TransitionModel::observe`]
//!   and [`TransitionModel::predict`].
//! - Threshold comparison belongs to the caller (see [`crate::prefetch`]).

mod transition;

pub use transition::{Prediction, TransitionModel, TransitionStats};

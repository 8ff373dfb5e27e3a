//! Speculative preload tasks.

use crate::events::AbandonReason;
use crate::transport::{PreloadTransport, TransportError, WarmHandle};
use crate::types::{AgentId, Context};
use futures::FutureExt;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};

/// What became of a preload once the next hop looked at it.
#[derive(Debug, Clone, PartialEq)]
pub enum PreloadOutcome {
    Warm(WarmHandle),
    Failed(TransportError),
    Abandoned(AbandonReason),
}

/// An in-flight or completed speculative warm-up of one agent.
///
/// The underlying task is bounded by the lifetime given at spawn time and is
/// aborted when the handle is dropped, so an unused preload never outlives
/// the hop that consumes (or ignores) it. Only [`PreloadHandle::claim`]
/// waits on it, and only for the grace period.
pub struct PreloadHandle {
    target: AgentId,
    task: Option<JoinHandle<Result<WarmHandle, TransportError>>>,
}

impl PreloadHandle {
    pub(crate) fn spawn(
        preloader: Arc<dyn PreloadTransport>,
        target: AgentId,
        context: Context,
        lifetime: Duration,
    ) -> Self {
        let agent = target.clone();
        let task = tokio::spawn(async move {
            match tokio::time::timeout(lifetime, preloader.preload(&agent, &context)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::debug!(agent = %agent, "preload exceeded its lifetime");
                    Err(TransportError::DeadlineExceeded(lifetime))
                }
            }
        });
        Self {
            target,
            task: Some(task),
        }
    }

    pub fn target(&self) -> &AgentId {
        &self.target
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map(JoinHandle::is_finished).unwrap_or(true)
    }

    /// Hands over the warm context if `next` is the preloaded agent.
    ///
    /// A preload of the right agent that is still running gets up to `grace`
    /// to finish; after that it is aborted. A preload of any other agent is
    /// dropped at once.
    pub async fn claim(mut self, next: &AgentId, grace: Duration) -> PreloadOutcome {
        if &self.target != next {
            return PreloadOutcome::Abandoned(AbandonReason::Mispredicted);
        }
        let Some(mut task) = self.task.take() else {
            return PreloadOutcome::Abandoned(AbandonReason::NotReady);
        };
        if task.is_finished() {
            return match task.now_or_never() {
                Some(joined) => resolve(joined),
                None => PreloadOutcome::Abandoned(AbandonReason::NotReady),
            };
        }
        if grace.is_zero() {
            task.abort();
            return PreloadOutcome::Abandoned(AbandonReason::NotReady);
        }
        match tokio::time::timeout(grace, &mut task).await {
            Ok(joined) => resolve(joined),
            Err(_) => {
                task.abort();
                PreloadOutcome::Abandoned(AbandonReason::NotReady)
            }
        }
    }
}

fn resolve(joined: Result<Result<WarmHandle, TransportError>, JoinError>) -> PreloadOutcome {
    match joined {
        Ok(Ok(warm)) => PreloadOutcome::Warm(warm),
        Ok(Err(e)) => PreloadOutcome::Failed(e),
        Err(join_err) => PreloadOutcome::Failed(TransportError::Failed(join_err.to_string())),
    }
}

impl Drop for PreloadHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl fmt::Debug for PreloadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreloadHandle")
            .field("target", &self.target)
            .field("finished", &self.is_finished())
            .finish()
    }
}

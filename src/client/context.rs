//! # Operation Context
//!
//! Cancellation and deadline carried through client construction and every
//! lifecycle call-out. Nothing reaching outside the process (secret reads,
//! marketplace queries, transaction broadcasts) may outlive a canceled context.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::constants::DEFAULT_OPERATION_TIMEOUT_SECS;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("operation canceled")]
    Cancelled,
    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),
}

/// Execution context bound to a client handle
#[derive(Debug, Clone)]
pub struct OperationContext {
    cancellation: CancellationToken,
    timeout: Duration,
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS))
    }
}

impl OperationContext {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            cancellation: CancellationToken::new(),
            timeout,
        }
    }

    /// Use an externally owned token, e.g. the controller's shutdown token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// A context canceled together with this one, but cancelable on its own
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
            timeout: self.timeout,
        }
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Drive `fut` to completion unless the context is canceled or the
    /// per-call timeout elapses first.
    pub async fn run<F, T>(&self, operation: &str, fut: F) -> Result<T, ContextError>
    where
        F: Future<Output = T>,
    {
        if self.cancellation.is_cancelled() {
            return Err(ContextError::Cancelled);
        }

        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => {
                debug!(operation, "call-out abandoned: context canceled");
                Err(ContextError::Cancelled)
            }
            result = tokio::time::timeout(self.timeout, fut) => {
                result.map_err(|_elapsed| {
                    debug!(operation, timeout = ?self.timeout, "call-out abandoned: timed out");
                    ContextError::TimedOut(self.timeout)
                })
            }
        }
    }
}

//! Bounded retry of batch writes under contention.

use crate::{StoreError, StoreResult};
use std::{future::Future, time::Duration};
use tracing::warn;

/// Default number of attempts per batch.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// How often, and how patiently, a batch write is re-run when the backend
/// reports [`StoreError::Contention`].
///
/// Only transient errors are retried. Anything else is returned on the first
/// occurrence. When every attempt hits contention the last error is wrapped
/// in [`StoreError::RetriesExhausted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, delay: DEFAULT_RETRY_DELAY }
    }
}

impl RetryPolicy {
    /// Create a new policy.
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Run `op` until it succeeds, fails fatally, or attempts run out.
    ///
    /// `op` must re-run the whole operation on every call.
    pub async fn run<T, F, Fut>(&self, op_name: &'static str, mut op: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    if attempt >= max_attempts {
                        return Err(StoreError::RetriesExhausted {
                            attempts: attempt,
                            source: Box::new(err),
                        });
                    }
                    warn!(
                        op = op_name,
                        attempt,
                        max_attempts,
                        %err,
                        "storage contention, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

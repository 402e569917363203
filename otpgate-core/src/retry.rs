//! Bounded, jittered retry for CAS conflicts and transient adapter/store faults.
//!
//! The orchestrator never retries unboundedly: a CAS conflict or a transient upstream failure
//! is retried a small, fixed number of times with jittered exponential backoff before being
//! surfaced to the caller as a retryable error.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

/// Configuration for [`retry_bounded`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first (non-retry) one.
    pub max_attempts: usize,
    /// The base delay before the first retry; grows exponentially (with jitter) afterwards.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// The policy used for session-store CAS conflicts: 3 attempts, starting at 10ms.
    pub fn cas_conflict() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
        }
    }

    fn builder(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_times(self.max_attempts.saturating_sub(1))
            .with_jitter()
    }
}

/// Runs `op`, retrying per `policy` as long as the error satisfies `should_retry`.
///
/// Returns the first success, or the last error once the attempt budget is exhausted.
pub async fn retry_bounded<T, E, Op, Fut, ShouldRetry>(
    policy: RetryPolicy,
    should_retry: ShouldRetry,
    op: Op,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    ShouldRetry: Fn(&E) -> bool,
{
    op.retry(policy.builder())
        .when(|err| should_retry(err))
        .notify(|err: &E, duration: Duration| {
            let _ = (err, duration);
            tracing::debug!(retry_after = ?duration, "retrying after transient failure");
        })
        .await
}

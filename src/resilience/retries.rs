//! Retry logic.
//!
//! # Responsibilities
//! - Repeat idempotent reads with exponential backoff + jitter
//! - Let the caller decide which errors are worth another pass
//!
//! # Design Decisions
//! - Never used for broadcasts: a broadcast that may have reached a node is
//!   not repeated
//! - Jittered backoff prevents thundering herd against public nodes

use std::future::Future;

use crate::resilience::backoff::BackoffPolicy;

/// How many times to repeat an idempotent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first.
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
}

/// Run `op` until it succeeds, `should_retry` rejects the error, or the
/// retry budget is spent. `op` receives the zero-based attempt number.
pub async fn retry_idempotent<T, E, F, Fut, P>(
    policy: RetryPolicy,
    mut op: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries && should_retry(&e) => {
                attempt += 1;
                let delay = policy.backoff.delay(attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying idempotent call"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

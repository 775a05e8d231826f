//! Retry with exponential backoff
//!
//! Shared by every fetch so the retry loop is written once. The operation decides
//! what its outcome type is; `should_retry` decides which outcomes are transient.

use std::future::Future;
use std::time::Duration;

/// Delay before retry `attempt` (0-based): `base * 2^attempt`
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(1u64 << attempt.min(20)))
}

/// Runs `operation` up to `max_retries + 1` times
///
/// The last outcome is returned as-is once it is not retryable or the attempts are
/// used up.
pub async fn with_retry<T, F, Fut, P>(
    max_retries: u32,
    backoff_base_ms: u64,
    should_retry: P,
    mut operation: F,
) -> T
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = T>,
    P: Fn(&T) -> bool,
{
    let mut attempt = 0u32;
    loop {
        let outcome = operation(attempt).await;
        if attempt >= max_retries || !should_retry(&outcome) {
            return outcome;
        }

        let delay = backoff_delay(backoff_base_ms, attempt);
        tracing::debug!(
            attempt,
            max_retries,
            delay_ms = delay.as_millis() as u64,
            "transient failure, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

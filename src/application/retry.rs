use crate::config::RetryPolicy;
use crate::error::Result;
use std::future::Future;
use tracing::{debug, warn};

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or the
/// policy's attempt budget is spent.
///
/// Each call to `attempt` must re-read whatever it depends on, since a retry
/// is only meaningful against fresh state.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Err(e) if e.is_retryable() && tries < policy.max_attempts => {
                debug!(operation, attempt = tries, error = %e, "retrying");
                tokio::time::sleep(policy.delay_for_attempt(tries)).await;
                tries += 1;
            }
            Err(e) if e.is_retryable() => {
                warn!(operation, attempts = tries, error = %e, "giving up after retries");
                return Err(e);
            }
            outcome => return outcome,
        }
    }
}

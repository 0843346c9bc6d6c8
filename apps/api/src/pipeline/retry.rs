//! Resilience wrapper: per-attempt timeout plus sequential retries with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::pipeline::PipelineError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Wall-clock bound on a single attempt. Hitting it counts as a normal failure.
    pub attempt_timeout: Duration,
    /// Delay before the second attempt; doubles for each later one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(45),
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff after the zero-indexed `attempt` failed: base * 2^attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Runs `op` until it succeeds or `policy.max_attempts` attempts have failed.
///
/// Attempts never overlap: the next one starts only after the previous one
/// failed or timed out and its backoff elapsed. No delay precedes the first
/// attempt or follows the last. The last error is returned unchanged.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let mut last_error = None;

    for attempt in 0..policy.max_attempts {
        let error = match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => PipelineError::Timeout,
        };

        warn!(
            "{label}: attempt {}/{} failed: {error}",
            attempt + 1,
            policy.max_attempts
        );

        if attempt + 1 < policy.max_attempts {
            let delay = policy.delay_after(attempt);
            warn!("{label}: retrying after {}ms...", delay.as_millis());
            tokio::time::sleep(delay).await;
        }
        last_error = Some(error);
    }

    Err(last_error.unwrap_or(PipelineError::RetriesExhausted))
}

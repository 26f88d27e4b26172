//! Bounded retry with a per-attempt timeout.

use anyhow::{Result, anyhow};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ATTEMPTS: u32 = 2;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(4000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Runs `op` up to `policy.attempts` times (at least once), abandoning any
/// attempt that exceeds `policy.timeout`. Returns the first success or the
/// last error.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut last_err = anyhow!("no attempt made");

    for attempt in 1..=attempts {
        match tokio::time::timeout(policy.timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                debug!(attempt, attempts, error = %e, "Provider attempt failed");
                last_err = e;
            }
            Err(_) => {
                debug!(
                    attempt,
                    attempts,
                    timeout_ms = policy.timeout.as_millis() as u64,
                    "Provider attempt timed out"
                );
                last_err = anyhow!("timed out after {} ms", policy.timeout.as_millis());
            }
        }
    }

    Err(last_err)
}

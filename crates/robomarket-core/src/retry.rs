//! Timeouts and bounded exponential backoff for external calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{MarketError, Result};

/// Retry policy applied to external collaborator calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            call_timeout: config.call_timeout(),
        }
    }
}

impl RetryPolicy {
    /// Run `call` once under the call timeout. No retry.
    pub async fn once<T, Fut>(&self, operation: &str, call: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(MarketError::Timeout {
                duration_ms: self.call_timeout.as_millis() as u64,
                operation: operation.to_string(),
            }),
        }
    }

    /// Run `call` until it succeeds, fails unrecoverably, or attempts run out.
    ///
    /// Returns the last error when every attempt failed.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match self.once(operation, call()).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_recoverable() || attempt >= self.max_attempts {
                debug!(operation, attempt, error = %err, "Giving up");
                return Err(err);
            }

            let delay = self.backoff(attempt - 1);
            warn!(
                operation,
                attempt,
                retry_in_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying after transient failure"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Delay before retry number `retries_used + 1`, with up to 20% jitter.
    pub fn backoff(&self, retries_used: u32) -> Duration {
        let base_ms = self.base_delay.as_millis();
        if base_ms == 0 {
            return Duration::ZERO;
        }
        let max_ms = self.max_delay.as_millis().max(base_ms);
        let shift = retries_used.min(20);
        let delay_ms = base_ms.saturating_mul(1u128 << shift).min(max_ms);
        let delay_ms = u64::try_from(delay_ms).unwrap_or(u64::MAX);
        let jitter = rand::thread_rng().gen_range(0..=delay_ms / 5);
        Duration::from_millis(delay_ms.saturating_add(jitter))
    }
}

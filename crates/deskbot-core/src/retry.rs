//! Bounded retry with exponential backoff and jitter.

use crate::config::RetryConfig;
use crate::error::{DeskbotError, Result};
use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Doubling delays from `base_delay`, capped at `max_delay`, with jitter.
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay.max(self.base_delay))
            .with_factor(2.0)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
            .with_jitter()
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// the attempts run out. Each attempt is bounded by `timeout`; an
    /// elapsed attempt counts as a transient failure.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, timeout: Duration, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempt = || {
            let call = op();
            async move {
                tokio::time::timeout(timeout, call).await.unwrap_or_else(|_| {
                    Err(DeskbotError::transient(
                        operation,
                        format!("no response within {} ms", timeout.as_millis()),
                    ))
                })
            }
        };

        let max_attempts = self.max_attempts;
        let mut retried = 0u32;
        attempt
            .retry(self.backoff())
            .when(DeskbotError::is_retryable)
            .notify(|e: &DeskbotError, delay: Duration| {
                retried += 1;
                warn!(
                    operation,
                    attempt = retried,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after transient failure"
                );
            })
            .await
    }
}

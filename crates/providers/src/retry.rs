//! Retry layer: bounded retries with exponential backoff and per-attempt
//! timeouts.
//!
//! Wraps any provider. Transient failures (rate limits, timeouts, network
//! errors, 5xx) are retried up to `max_retries` times; everything else is
//! returned immediately.

use async_trait::async_trait;
use scout_core::error::ProviderError;
use scout_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff configuration for model API retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = no retries).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Maximum backoff cap.
    pub max_delay: Duration,
    /// Multiplier per consecutive failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based) after `error`.
    ///
    /// A provider-supplied `retry_after` wins when it is longer than the
    /// computed backoff. Both are capped at `max_delay`.
    pub fn delay_for(&self, retry: u32, error: &ProviderError) -> Duration {
        let backoff_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(retry as i32);
        let mut delay = Duration::from_secs_f64(backoff_secs.min(self.max_delay.as_secs_f64()));

        if let ProviderError::RateLimited { retry_after_secs } = error {
            delay = delay.max(Duration::from_secs(*retry_after_secs));
        }

        delay.min(self.max_delay)
    }
}

/// A provider that retries transient failures of an inner provider.
pub struct RetryProvider {
    inner: Arc<dyn scout_core::Provider>,
    policy: RetryPolicy,
    attempt_timeout: Option<Duration>,
}

impl RetryProvider {
    pub fn new(inner: Arc<dyn scout_core::Provider>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            attempt_timeout: None,
        }
    }

    /// Bound every single attempt; a timed-out attempt counts as retryable.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    async fn attempt(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let Some(timeout) = self.attempt_timeout else {
            return self.inner.complete(request).await;
        };

        match tokio::time::timeout(timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "Provider '{}' timed out after {}s",
                self.inner.name(),
                timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl scout_core::Provider for RetryProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut retry = 0;

        loop {
            match self.attempt(request.clone()).await {
                Ok(response) => {
                    if retry > 0 {
                        debug!(provider = %self.name(), retries = retry, "Provider recovered");
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && retry < self.policy.max_retries => {
                    let delay = self.policy.delay_for(retry, &e);
                    warn!(
                        provider = %self.name(),
                        error = %e,
                        attempt = retry + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Transient provider failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

//! LLM provider implementations for Scout.
//!
//! All providers implement the `scout_core::Provider` trait.
//! [`build_from_config`] assembles the provider stack the binary uses:
//! an OpenAI-compatible client wrapped in a retry layer.

pub mod openai_compat;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use scout_config::AppConfig;
use scout_core::ProviderError;
use scout_core::provider::Provider;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::{RetryPolicy, RetryProvider};

/// Build the configured provider: OpenAI-compatible client + retry layer.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| ProviderError::NotConfigured("no API key configured".into()))?;

    let timeout = Duration::from_secs(config.agent.request_timeout_secs);
    let inner = OpenAiCompatProvider::new("openai", &config.api_url, api_key, timeout)?;

    let policy = RetryPolicy {
        max_retries: config.agent.max_retries,
        base_delay: Duration::from_millis(config.agent.retry_base_delay_ms),
        ..RetryPolicy::default()
    };

    Ok(Arc::new(
        RetryProvider::new(Arc::new(inner), policy).with_attempt_timeout(timeout),
    ))
}

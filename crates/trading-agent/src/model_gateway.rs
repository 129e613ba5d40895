use std::time::Duration;

use async_trait::async_trait;
use signal_core::{LanguageModel, ModelError, ReasoningModels};

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Delay before retry number `attempt` (0-based): base * 2^attempt, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500), Duration::from_secs(8))
    }
}

/// Wraps a model with retry on transient failures and empty-reply detection.
pub struct RetryingModel<M> {
    inner: M,
    policy: RetryPolicy,
    reasoning: bool,
}

impl<M: LanguageModel> RetryingModel<M> {
    pub fn new(inner: M, policy: RetryPolicy, reasoning_models: &ReasoningModels) -> Self {
        let reasoning = reasoning_models.is_reasoning(inner.model_name());
        Self {
            inner,
            policy,
            reasoning,
        }
    }

    /// Whether replies are expected to open with a think block
    pub fn expects_reasoning(&self) -> bool {
        self.reasoning
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl<M: LanguageModel> LanguageModel for RetryingModel<M> {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, ModelError> {
        let mut attempt = 0u32;
        loop {
            let result = match self.inner.complete(system_prompt, prompt).await {
                Ok(reply) if reply.trim().is_empty() => Err(ModelError::EmptyResponse),
                other => other,
            };

            match result {
                Ok(reply) => {
                    if attempt > 0 {
                        tracing::info!("{} answered after {} retries", self.inner.model_name(), attempt);
                    }
                    return Ok(reply);
                }
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        "{} failed ({}), retry {}/{} in {:?}",
                        self.inner.model_name(),
                        e,
                        attempt + 1,
                        self.policy.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!("{} gave up after {} attempts: {}", self.inner.model_name(), attempt + 1, e);
                    return Err(e);
                }
            }
        }
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/*!
 * Translation client with bounded retry.
 *
 * Sends one batch per call. Transient provider failures are retried with a
 * linear backoff; anything else, and exhaustion of the attempts, surfaces as
 * a pipeline error. A response that arrives but is malformed is returned
 * as-is for the reconciler to deal with.
 */

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use super::prompts::Instructions;
use crate::errors::PipelineError;
use crate::providers::{CompletionRequest, Provider};

/// Bounded retry policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay unit multiplied by the attempt number
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        backoff_delay(attempt, self.backoff_base)
    }
}

/// Linear backoff: `base * attempt`
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    base.saturating_mul(attempt)
}

/// Raw text of a successful call
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceReply {
    /// Assistant text
    pub text: String,
    /// Prompt tokens reported by the provider
    pub prompt_tokens: Option<u64>,
    /// Completion tokens reported by the provider
    pub completion_tokens: Option<u64>,
    /// Attempts used, 1 when the first call succeeded
    pub attempts: u32,
}

/// Sends batches to a provider
#[derive(Debug)]
pub struct TranslationClient<P: Provider> {
    provider: Arc<P>,
    model: String,
    temperature: f32,
    retry: RetryPolicy,
}

impl<P: Provider> TranslationClient<P> {
    pub fn new(provider: Arc<P>, model: impl Into<String>, temperature: f32, retry: RetryPolicy) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            retry,
        }
    }

    /// Provider name for logs
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send one batch, retrying transient failures
    pub async fn translate(&self, instructions: &Instructions) -> Result<ServiceReply, PipelineError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let request = CompletionRequest {
                model: self.model.clone(),
                system: instructions.system.clone(),
                user: instructions.user.clone(),
                temperature: self.temperature,
            };

            match self.provider.complete(request).await {
                Ok(response) => {
                    debug!("{} answered on attempt {}", self.provider.name(), attempt);
                    return Ok(ServiceReply {
                        text: response.text,
                        prompt_tokens: response.prompt_tokens,
                        completion_tokens: response.completion_tokens,
                        attempts: attempt,
                    });
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(PipelineError::Transport { attempts: attempt, source: e });
                }
            }
        }
    }
}

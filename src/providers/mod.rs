/*!
 * Provider implementations for external services.
 *
 * - OpenAI: the chat-style translation service
 * - GeoNames: city lookup used to seed the cities table
 * - Mock: scripted translation provider for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// One chat-style completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// System instructions
    pub system: String,
    /// User message
    pub user: String,
    /// Sampling temperature
    pub temperature: f32,
}

/// Text returned by a completion request with its token usage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    /// Assistant text
    pub text: String,
    /// Prompt tokens reported by the service
    pub prompt_tokens: Option<u64>,
    /// Completion tokens reported by the service
    pub completion_tokens: Option<u64>,
}

/// Common trait for translation service providers
///
/// Implementations make exactly one attempt per call. Retrying is the
/// caller's business, driven by `ProviderError::is_transient`.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self, model: &str) -> Result<(), ProviderError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

pub mod geonames;
pub mod mock;
pub mod openai;

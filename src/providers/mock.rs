/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::echo()` - Answers every batch with well-formed translations
 * - `MockProvider::scripted(..)` - Replays a queue of replies and errors in order
 * - `MockProvider::failing()` - Always fails with a server error
 */

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

/// One scripted reply
#[derive(Debug)]
pub enum MockReply {
    /// Return this text as the assistant answer
    Text(String),
    /// Fail the call with this error
    Error(ProviderError),
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Translate every payload string by prefixing a marker
    Echo,
    /// Replay the script; echo once it runs out
    Scripted,
    /// Always fail with a server error
    Failing,
}

/// Prefix added by echo translations
pub const ECHO_PREFIX: &str = "[ja] ";

/// Mock provider for testing pipeline behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Pending scripted replies
    script: Arc<Mutex<VecDeque<MockReply>>>,
    /// Request counter
    request_count: Arc<AtomicUsize>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            script: Arc::new(Mutex::new(VecDeque::new())),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that answers every batch correctly
    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    /// Create a mock that replays the given replies in order
    pub fn scripted(replies: impl IntoIterator<Item = MockReply>) -> Self {
        let provider = Self::new(MockBehavior::Scripted);
        if let Ok(mut script) = provider.script.lock() {
            script.extend(replies);
        }
        provider
    }

    /// Create a mock that always fails
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Number of calls made so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copies of the requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Translate a payload the way a well-behaved service would
    pub fn echo_translation(payload: &Value) -> Value {
        match payload {
            Value::String(s) => Value::String(format!("{}{}", ECHO_PREFIX, s)),
            Value::Array(items) => Value::Array(items.iter().map(Self::echo_translation).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::echo_translation(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn echo_reply(request: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let payload: Value = serde_json::from_str(&request.user)
            .map_err(|e| ProviderError::RequestFailed(format!("Mock could not read payload: {}", e)))?;
        let translated = Self::echo_translation(&payload);
        Ok(CompletionResponse {
            text: translated.to_string(),
            prompt_tokens: Some(request.user.len() as u64),
            completion_tokens: Some((request.user.len() / 2) as u64),
        })
    }

    fn next_scripted(&self) -> Option<MockReply> {
        self.script.lock().ok().and_then(|mut script| script.pop_front())
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match self.behavior {
            MockBehavior::Echo => Self::echo_reply(&request),

            MockBehavior::Scripted => match self.next_scripted() {
                Some(MockReply::Text(text)) => Ok(CompletionResponse {
                    text,
                    prompt_tokens: Some(10),
                    completion_tokens: Some(10),
                }),
                Some(MockReply::Error(err)) => Err(err),
                None => Self::echo_reply(&request),
            },

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),
        }
    }

    async fn test_connection(&self, _model: &str) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated outage".to_string())),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

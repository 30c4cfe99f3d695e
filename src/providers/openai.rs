use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

/// Default OpenAI API base URL
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Which OpenAI API surface to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OpenAIApi {
    /// `POST /chat/completions`
    Chat,
    /// `POST /responses`
    #[default]
    Responses,
}

/// OpenAI client for the translation service
#[derive(Debug)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API base URL
    endpoint: String,
    /// API surface
    api: OpenAIApi,
}

/// Chat message format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Chat Completions request
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

/// Chat Completions response
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    /// Completion choices
    pub choices: Vec<ChatChoice>,
    /// Token usage
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

/// One completion choice
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// The assistant message
    pub message: ChatChoiceMessage,
}

/// Assistant message of a choice; content may be null
#[derive(Debug, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Chat Completions token usage
#[derive(Debug, Deserialize)]
pub struct ChatUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Responses API request
#[derive(Debug, Serialize)]
pub struct ResponsesRequest {
    model: String,
    input: Vec<ResponsesInputMessage>,
    temperature: f32,
}

/// One input message of a Responses request
#[derive(Debug, Serialize)]
pub struct ResponsesInputMessage {
    role: String,
    content: Vec<ResponsesInputContent>,
}

/// Input content block
#[derive(Debug, Serialize)]
pub struct ResponsesInputContent {
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

/// Responses API response
#[derive(Debug, Deserialize)]
pub struct ResponsesResponse {
    /// Output items
    #[serde(default)]
    pub output: Vec<ResponsesOutputItem>,
    /// Token usage
    #[serde(default)]
    pub usage: Option<ResponsesUsage>,
}

/// One output item
#[derive(Debug, Deserialize)]
pub struct ResponsesOutputItem {
    #[serde(default)]
    pub content: Vec<ResponsesOutputContent>,
}

/// Output content block
#[derive(Debug, Deserialize)]
pub struct ResponsesOutputContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: String,
}

/// Responses API token usage
#[derive(Debug, Deserialize)]
pub struct ResponsesUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl ChatCompletionRequest {
    /// Build a chat request from a completion request
    pub fn from_completion(request: &CompletionRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: request.system.clone() },
                ChatMessage { role: "user".to_string(), content: request.user.clone() },
            ],
            temperature: request.temperature,
        }
    }
}

impl ResponsesRequest {
    /// Build a Responses request from a completion request
    pub fn from_completion(request: &CompletionRequest) -> Self {
        let message = |role: &str, text: &str| ResponsesInputMessage {
            role: role.to_string(),
            content: vec![ResponsesInputContent {
                content_type: "input_text".to_string(),
                text: text.to_string(),
            }],
        };
        Self {
            model: request.model.clone(),
            input: vec![message("system", &request.system), message("user", &request.user)],
            temperature: request.temperature,
        }
    }
}

impl ChatCompletionResponse {
    /// Text of the first choice
    pub fn text(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}

impl ResponsesResponse {
    /// Concatenated `output_text` blocks, one per line
    pub fn text(&self) -> String {
        self.output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter(|c| c.content_type == "output_text")
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

impl OpenAI {
    /// Create a new OpenAI client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        api: OpenAIApi,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = endpoint.into();
        let endpoint = if endpoint.trim().is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            endpoint.trim_end_matches('/').to_string()
        };

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint,
            api,
        })
    }

    fn url(&self) -> String {
        match self.api {
            OpenAIApi::Chat => format!("{}/chat/completions", self.endpoint),
            OpenAIApi::Responses => format!("{}/responses", self.endpoint),
        }
    }

    async fn post<B: Serialize>(&self, body: &B) -> Result<String, ProviderError> {
        let url = self.url();
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            error!("OpenAI API error ({}): {}", status, text);
            return Err(ProviderError::from_status(status.as_u16(), text));
        }

        Ok(text)
    }
}

#[async_trait]
impl Provider for OpenAI {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        match self.api {
            OpenAIApi::Chat => {
                let body = self.post(&ChatCompletionRequest::from_completion(&request)).await?;
                let parsed: ChatCompletionResponse = serde_json::from_str(&body)
                    .map_err(|e| ProviderError::ParseError(e.to_string()))?;
                Ok(CompletionResponse {
                    text: parsed.text(),
                    prompt_tokens: parsed.usage.as_ref().map(|u| u.prompt_tokens),
                    completion_tokens: parsed.usage.as_ref().map(|u| u.completion_tokens),
                })
            }
            OpenAIApi::Responses => {
                let body = self.post(&ResponsesRequest::from_completion(&request)).await?;
                let parsed: ResponsesResponse = serde_json::from_str(&body)
                    .map_err(|e| ProviderError::ParseError(e.to_string()))?;
                Ok(CompletionResponse {
                    text: parsed.text(),
                    prompt_tokens: parsed.usage.as_ref().map(|u| u.input_tokens),
                    completion_tokens: parsed.usage.as_ref().map(|u| u.output_tokens),
                })
            }
        }
    }

    async fn test_connection(&self, model: &str) -> Result<(), ProviderError> {
        let request = CompletionRequest {
            model: model.to_string(),
            system: "Reply with OK.".to_string(),
            user: "Hello".to_string(),
            temperature: 0.0,
        };
        self.complete(request).await.map(|_| ())
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/*!
 * Tests for provider request and response formats
 */

use anyhow::Result;
use serde_json::json;

use moontrans::providers::geonames::parse_search_response;
use moontrans::providers::mock::MockProvider;
use moontrans::providers::openai::{ChatCompletionRequest, ChatCompletionResponse, ResponsesRequest, ResponsesResponse};
use moontrans::providers::{CompletionRequest, Provider};

fn completion_request() -> CompletionRequest {
    CompletionRequest {
        model: "gpt-4.1-mini".to_string(),
        system: "You translate calendar texts".to_string(),
        user: r#"["Osaka"]"#.to_string(),
        temperature: 0.2,
    }
}

/// Test the chat request body
#[test]
fn test_chatRequest_fromCompletion_shouldSendSystemThenUser() -> Result<()> {
    let body = serde_json::to_value(ChatCompletionRequest::from_completion(&completion_request()))?;
    assert_eq!(body["model"], "gpt-4.1-mini");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], r#"["Osaka"]"#);
    Ok(())
}

/// Test the Responses request body
#[test]
fn test_responsesRequest_fromCompletion_shouldWrapTextBlocks() -> Result<()> {
    let body = serde_json::to_value(ResponsesRequest::from_completion(&completion_request()))?;
    assert_eq!(body["input"][1]["role"], "user");
    assert_eq!(body["input"][1]["content"][0]["type"], "input_text");
    Ok(())
}

/// Test reading text and usage from a chat response
#[test]
fn test_chatResponse_withUsage_shouldExposeTextAndTokens() -> Result<()> {
    let response: ChatCompletionResponse = serde_json::from_value(json!({
        "choices": [{"message": {"content": "[\"大阪\"]"}}],
        "usage": {"prompt_tokens": 42, "completion_tokens": 7, "total_tokens": 49}
    }))?;
    assert_eq!(response.text(), r#"["大阪"]"#);
    assert_eq!(response.usage.map(|u| u.completion_tokens), Some(7));
    Ok(())
}

/// Test that a Responses answer without output text is empty
#[test]
fn test_responsesResponse_withoutOutputText_shouldBeEmpty() -> Result<()> {
    let response: ResponsesResponse = serde_json::from_value(json!({
        "output": [{"type": "reasoning", "content": []}]
    }))?;
    assert_eq!(response.text(), "");
    Ok(())
}

/// Test that an empty lookup result is an error
#[test]
fn test_parseSearchResponse_withNoPlaces_shouldFail() {
    assert!(parse_search_response(r#"{"geonames": []}"#).is_err());
    assert!(parse_search_response("not json").is_err());
}

/// Test the mock provider's connection check and identity
#[tokio::test]
async fn test_mockProvider_testConnection_shouldSucceedWithoutRecording() -> Result<()> {
    let provider = MockProvider::echo();
    provider.test_connection("gpt-4.1-mini").await?;
    assert_eq!(provider.name(), "mock");
    assert_eq!(provider.request_count(), 0);
    Ok(())
}

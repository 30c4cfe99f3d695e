/*!
 * Tests for error types and conversions
 */

use moontrans::errors::{AppError, PipelineError, ProviderError};

/// Test provider error display strings
#[test]
fn test_providerError_display_shouldCarryMessage() {
    let error = ProviderError::RequestFailed("Connection timeout".to_string());
    assert!(error.to_string().contains("API request failed"));
    assert!(error.to_string().contains("Connection timeout"));

    let error = ProviderError::ApiError {
        status_code: 503,
        message: "Service unavailable".to_string(),
    };
    assert!(error.to_string().contains("503"));
    assert!(error.to_string().contains("Service unavailable"));
}

/// Test that only retryable provider failures are transient
#[test]
fn test_providerError_isTransient_withEachVariant_shouldClassify() {
    assert!(ProviderError::ConnectionError("reset".to_string()).is_transient());
    assert!(ProviderError::ParseError("truncated".to_string()).is_transient());
    assert!(ProviderError::from_status(429, "slow down").is_transient());
    assert!(ProviderError::from_status(500, "oops").is_transient());
    assert!(!ProviderError::from_status(404, "no such model").is_transient());
    assert!(!ProviderError::from_status(403, "forbidden").is_transient());
}

/// Test pipeline error display strings
#[test]
fn test_pipelineError_display_shouldNameTheStage() {
    assert_eq!(
        PipelineError::Schema("Source table CITIES_ENG not found".to_string()).to_string(),
        "Schema error: Source table CITIES_ENG not found"
    );
    assert!(PipelineError::Repair("Expected 2 got 1".to_string()).to_string().starts_with("Repair error"));
    assert!(PipelineError::Commit("disk full".to_string()).to_string().contains("disk full"));
    assert!(!PipelineError::Config("no key".to_string()).is_transport());
}

/// Test that the transport error keeps the provider error as its source
#[test]
fn test_pipelineError_transport_shouldExposeSource() {
    use std::error::Error;

    let error = PipelineError::Transport {
        attempts: 2,
        source: ProviderError::RateLimitExceeded("quota".to_string()),
    };
    let source = error.source().map(|s| s.to_string()).unwrap_or_default();
    assert!(source.contains("Rate limit exceeded"));
}

/// Test conversions into the application error
#[test]
fn test_appError_from_shouldWrapEachKind() {
    let app: AppError = ProviderError::AuthenticationError("bad key".to_string()).into();
    assert!(matches!(app, AppError::Provider(_)));

    let app: AppError = PipelineError::Commit("locked".to_string()).into();
    assert!(app.to_string().contains("Pipeline error"));

    let app: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "conf.json").into();
    assert!(matches!(app, AppError::File(_)));

    let app: AppError = anyhow::anyhow!("something else").into();
    assert!(matches!(app, AppError::Unknown(_)));
}

/// Test that pipeline errors survive being carried through anyhow
#[test]
fn test_pipelineError_throughAnyhow_shouldDowncast() {
    let error: anyhow::Error = PipelineError::Schema("missing".to_string()).into();
    assert!(matches!(error.downcast_ref::<PipelineError>(), Some(PipelineError::Schema(_))));
}

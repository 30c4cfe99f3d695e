/*!
 * Error types for the moontrans application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether a retry of the same request may succeed.
    ///
    /// Network failures, unreadable transport envelopes, server errors and
    /// rate limiting are transient. Client errors and bad credentials are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_)
            | Self::ParseError(_)
            | Self::ConnectionError(_)
            | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationError(_) => false,
        }
    }

    /// Classify a non-success HTTP status into a provider error.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

/// Errors that abort a translation run.
///
/// Only `Transport` is ever produced after retrying; every other variant is
/// structural and surfaces on first occurrence.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Missing table, missing columns, or a review log without key columns
    #[error("Schema error: {0}")]
    Schema(String),

    /// The translation service kept failing after all attempts
    #[error("Translation service error after {attempts} attempt(s): {source}")]
    Transport {
        /// Number of attempts made
        attempts: u32,
        /// Last provider error observed
        #[source]
        source: ProviderError,
    },

    /// The service response could not be shaped into the expected batch
    #[error("Repair error: {0}")]
    Repair(String),

    /// Writing the review log or the target store failed mid-batch
    #[error("Commit error: {0}")]
    Commit(String),

    /// Invalid run configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Whether the error came from the translation service transport.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the translation pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for Echo
//!
//! Every fallible operation in the crate returns [`Result`]. Vendor failures
//! are carried as [`ApiError`] until the provider session turns them into a
//! spoken apology.

use thiserror::Error;

/// Main error type for Echo operations
#[derive(Error, Debug)]
pub enum EchoError {
    /// API-related errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Configuration errors (missing keys, unknown provider, bad values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Plugin discovery, validation or execution errors
    #[error("Plugin error: {0}")]
    Plugin(String),

    /// Memory store errors
    #[error("Memory error: {0}")]
    Memory(String),

    /// Encryption or decryption failures
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// API-specific error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed (invalid API key)
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Rate limited by the API
    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    /// Requested model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Network connectivity error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid response from API
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// API returned an error
    #[error("API error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Timeout waiting for response
    #[error("Request timed out")]
    Timeout,

    /// Streaming error
    #[error("Streaming error: {0}")]
    StreamError(String),
}

/// Result type alias for Echo operations
pub type Result<T> = std::result::Result<T, EchoError>;

impl From<aes_gcm::Error> for EchoError {
    fn from(_: aes_gcm::Error) -> Self {
        // aead::Error carries no detail
        EchoError::Crypto("authenticated decryption failed".to_string())
    }
}

impl From<tokio::time::error::Elapsed> for EchoError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        EchoError::Api(ApiError::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_error_config() {
        let err = EchoError::Config("bad config".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_echo_error_plugin() {
        let err = EchoError::Plugin("missing commands".to_string());
        assert_eq!(err.to_string(), "Plugin error: missing commands");
    }

    #[test]
    fn test_echo_error_memory() {
        let err = EchoError::Memory("history.enc is corrupt".to_string());
        assert!(err.to_string().contains("Memory error"));
    }

    #[test]
    fn test_echo_error_invalid_input() {
        let err = EchoError::InvalidInput("bad input".to_string());
        assert!(err.to_string().contains("Invalid input"));
    }

    #[test]
    fn test_echo_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EchoError = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_echo_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: EchoError = json_err.into();
        assert!(err.to_string().contains("JSON error"));
    }

    #[test]
    fn test_echo_error_from_aead() {
        let err: EchoError = aes_gcm::Error.into();
        assert!(matches!(err, EchoError::Crypto(_)));
    }

    #[tokio::test]
    async fn test_echo_error_from_elapsed() {
        let elapsed = tokio::time::timeout(
            std::time::Duration::from_millis(1),
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();
        let err: EchoError = elapsed.into();
        assert!(matches!(err, EchoError::Api(ApiError::Timeout)));
    }

    #[test]
    fn test_api_error_rate_limited() {
        let err = ApiError::RateLimited(30);
        assert!(err.to_string().contains("Rate limited"));
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn test_api_error_server_error() {
        let err = ApiError::ServerError {
            status: 500,
            message: "internal server error".to_string(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("internal server error"));
    }

    #[test]
    fn test_api_error_timeout() {
        assert!(ApiError::Timeout.to_string().contains("timed out"));
    }

    #[test]
    fn test_echo_error_from_api_error() {
        let err: EchoError = ApiError::AuthenticationFailed.into();
        assert!(err.to_string().contains("API error"));
    }
}

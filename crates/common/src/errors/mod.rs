//! Error types for IdeaForge
//!
//! Provides a single error taxonomy with:
//! - Distinct variants for configuration, upstream, and oracle failures
//! - Retry classification for the bounded retry wrapper
//! - Error codes for structured logging

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidFormat,

    // External service errors (8xxx)
    UpstreamError,
    UpstreamRateLimited,
    OracleError,
    OracleParseError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
    IoError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidFormat => 1003,

            ErrorCode::UpstreamError => 8001,
            ErrorCode::UpstreamRateLimited => 8002,
            ErrorCode::OracleError => 8010,
            ErrorCode::OracleParseError => 8011,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::IoError => 9004,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    /// A remote service answered with a failure status or could not be reached
    #[error("Upstream error from {service}: {message}")]
    Upstream {
        service: String,
        status: Option<u16>,
        message: String,
    },

    /// The language-model oracle failed to produce a completion
    #[error("Oracle error: {message}")]
    Oracle { message: String },

    /// The oracle produced text that does not match the expected structure
    #[error("Failed to parse oracle output: {message}")]
    Parse { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a parse failure
    pub fn parse(message: impl Into<String>) -> Self {
        AppError::Parse {
            message: message.into(),
        }
    }

    /// Shorthand for an upstream failure
    pub fn upstream(service: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        AppError::Upstream {
            service: service.to_string(),
            status,
            message: message.into(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::Upstream {
                status: Some(429), ..
            } => ErrorCode::UpstreamRateLimited,
            AppError::Upstream { .. } => ErrorCode::UpstreamError,
            AppError::Oracle { .. } => ErrorCode::OracleError,
            AppError::Parse { .. } => ErrorCode::OracleParseError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Io(_) => ErrorCode::IoError,
            AppError::Internal { .. } | AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Whether a bounded retry may succeed where this attempt failed.
    ///
    /// Malformed oracle output, oracle hiccups, timeouts, throttling and
    /// server-side failures are worth another attempt. Anything caused by
    /// our own configuration or request shape is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Parse { .. } | AppError::Oracle { .. } => true,
            AppError::Upstream { status, .. } => match status {
                Some(code) => *code == 429 || *code >= 500,
                None => true,
            },
            AppError::HttpClient(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_decode()
                    || e.status().map_or(false, |s| s.as_u16() == 429 || s.is_server_error())
            }
            _ => false,
        }
    }

    /// Whether the whole run must stop.
    ///
    /// Only configuration problems and rejected credentials qualify; any other
    /// failure abandons the current step and the run keeps what it has.
    pub fn aborts_run(&self) -> bool {
        match self {
            AppError::Configuration { .. } | AppError::Validation { .. } => true,
            AppError::Upstream { status, .. } => matches!(status, Some(401) | Some(403)),
            AppError::HttpClient(e) => e
                .status()
                .map_or(false, |s| s.as_u16() == 401 || s.as_u16() == 403),
            _ => false,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|f| f.to_string());
        AppError::Validation {
            message: err.to_string(),
            field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::parse("no JSON object found");
        assert_eq!(err.code(), ErrorCode::OracleParseError);
        assert_eq!(err.code().as_code(), 8011);
    }

    #[test]
    fn test_rate_limited_code() {
        let err = AppError::upstream("semantic_scholar", Some(429), "Too Many Requests");
        assert_eq!(err.code(), ErrorCode::UpstreamRateLimited);
    }

    #[test]
    fn test_retry_classification() {
        assert!(AppError::parse("bad").is_retryable());
        assert!(AppError::Oracle { message: "empty".into() }.is_retryable());
        assert!(AppError::upstream("llm", Some(503), "unavailable").is_retryable());
        assert!(AppError::upstream("llm", Some(429), "slow down").is_retryable());
        assert!(!AppError::upstream("llm", Some(401), "bad key").is_retryable());
        assert!(!AppError::Configuration { message: "missing".into() }.is_retryable());
        assert!(!AppError::Validation { message: "x".into(), field: None }.is_retryable());
    }

    #[test]
    fn test_only_auth_and_config_abort_run() {
        assert!(AppError::Configuration { message: "missing".into() }.aborts_run());
        assert!(AppError::upstream("llm", Some(401), "bad key").aborts_run());
        assert!(AppError::upstream("llm", Some(403), "forbidden").aborts_run());
        assert!(!AppError::upstream("llm", Some(400), "context_length_exceeded").aborts_run());
        assert!(!AppError::upstream("llm", Some(503), "unavailable").aborts_run());
        assert!(!AppError::parse("bad").aborts_run());
    }
}

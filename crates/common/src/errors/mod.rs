//! Error types for TrustGraph services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for engine and gateway failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Request errors (1xxx)
    BadRequest,
    InvalidArgument,
    ResourceExhausted,

    // Lookup errors (4xxx)
    NotFound,
    UnknownIdentity,

    // Rate limiting (6xxx)
    RateLimited,

    // External collaborator errors (8xxx)
    TransientIo,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,

    // Graph has not finished its first recompute
    NotReady,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Request (1xxx)
            ErrorCode::BadRequest => 1001,
            ErrorCode::InvalidArgument => 1002,
            ErrorCode::ResourceExhausted => 1003,

            // Lookup (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::UnknownIdentity => 4002,

            // Rate limits (6xxx)
            ErrorCode::RateLimited => 6001,

            // External (8xxx)
            ErrorCode::TransientIo => 8001,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,

            ErrorCode::NotReady => 9999,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Request errors
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Batch too large: {size} items exceeds limit of {limit}")]
    ResourceExhausted { size: usize, limit: usize },

    // Lookup errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Unknown identity: {id}")]
    UnknownIdentity { id: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // External collaborator errors
    #[error("Transient I/O error: {message}")]
    TransientIo { message: String },

    // Readiness
    #[error("Graph not ready: no recompute has completed yet")]
    NotReady,

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::BadRequest { .. } => ErrorCode::BadRequest,
            AppError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            AppError::ResourceExhausted { .. } => ErrorCode::ResourceExhausted,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::UnknownIdentity { .. } => ErrorCode::UnknownIdentity,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::TransientIo { .. } => ErrorCode::TransientIo,
            AppError::NotReady => ErrorCode::NotReady,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::BadRequest { .. } |
            AppError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NotFound { .. } |
            AppError::UnknownIdentity { .. } => StatusCode::NOT_FOUND,

            // 413 Payload Too Large
            AppError::ResourceExhausted { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Internal { .. } |
            AppError::Configuration { .. } |
            AppError::Serialization(_) |
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::TransientIo { .. } => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub numeric_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                numeric_code: code.as_code(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::UnknownIdentity { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::UnknownIdentity);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_argument_is_client_error() {
        let err = AppError::InvalidArgument {
            message: "identity must be lowercase hex".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_batch_cap_maps_to_payload_too_large() {
        let err = AppError::ResourceExhausted { size: 101, limit: 100 };
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.code().as_code(), 1003);
    }

    #[test]
    fn test_not_ready_is_unavailable() {
        let err = AppError::NotReady;
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.is_server_error());
    }
}

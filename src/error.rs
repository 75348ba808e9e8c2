//! Error types for reply-pacer
//!
//! This module provides the error taxonomy for the library:
//! - Validation errors raised before any buffer or gate state is touched
//! - Transport errors reported by channel clients (chunk-local, aggregated)
//! - Concurrency errors from the delivery gate (not expected in normal operation)
//! - HTTP status code mapping and structured error bodies for the REST API

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for reply-pacer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for reply-pacer
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid caller input (empty text, out-of-range parameters)
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Channel client failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Unexpected failure inside the delivery gate
    #[error("concurrency error: {0}")]
    Concurrency(#[from] ConcurrencyError),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "chunking.max_chars")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Shutdown in progress - not accepting new messages
    #[error("shutdown in progress: not accepting new messages")]
    ShuttingDown,
}

/// Rejected caller input
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Text is empty or whitespace-only
    #[error("text is empty or whitespace-only")]
    EmptyInput,

    /// Recipient identifier is empty
    #[error("recipient identifier is empty")]
    EmptyRecipient,

    /// Minimum delay exceeds maximum delay
    #[error("min delay {min_ms}ms exceeds max delay {max_ms}ms")]
    InvalidDelayRange {
        /// The requested minimum delay in milliseconds
        min_ms: u64,
        /// The requested maximum delay in milliseconds
        max_ms: u64,
    },

    /// A numeric parameter fell outside its accepted range
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Name of the offending parameter
        field: &'static str,
        /// The value supplied by the caller
        value: u64,
        /// Inclusive lower bound
        min: u64,
        /// Inclusive upper bound
        max: u64,
    },
}

/// Failures reported by a channel client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The provider refused this particular message (bad number, content policy, ...)
    #[error("provider rejected message ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the provider
        status: u16,
        /// Provider-supplied reason
        message: String,
    },

    /// Credentials were refused
    #[error("provider refused credentials ({status})")]
    Unauthorized {
        /// HTTP status returned by the provider
        status: u16,
    },

    /// The provider is overloaded or failing (429, 5xx)
    #[error("provider unavailable ({status}): {message}")]
    Unavailable {
        /// HTTP status returned by the provider
        status: u16,
        /// Provider-supplied reason
        message: String,
    },

    /// Connection, DNS or timeout failure before a response was received
    #[error("network failure: {0}")]
    Network(String),

    /// The provider answered but the body could not be understood
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl TransportError {
    /// Whether this failure points at the channel as a whole rather than one message
    ///
    /// Systemic failures on the very first send make the dispatcher fall back to
    /// a single unchunked send.
    pub fn is_systemic(&self) -> bool {
        !matches!(self, TransportError::Rejected { .. })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TransportError::MalformedResponse(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

/// Internal failures of the delivery gate
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConcurrencyError {
    /// The gate worker has stopped and no longer accepts jobs
    #[error("delivery gate worker is not running")]
    GateClosed,

    /// A job panicked while holding the gate
    #[error("dispatch job panicked: {0}")]
    JobPanicked(String),

    /// A blocking bridge was invoked from inside an async runtime
    #[error("blocking call made from within an async runtime")]
    BlockingInAsyncContext,

    /// The gate worker could not be started
    #[error("failed to start delivery gate worker: {0}")]
    WorkerStart(String),
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "empty_input",
///     "message": "validation error: text is empty or whitespace-only"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "empty_input", "out_of_range")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 422,
            Error::Config { .. } => 400,
            Error::Transport(_) => 502,
            Error::Concurrency(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Validation(e) => match e {
                ValidationError::EmptyInput => "empty_input",
                ValidationError::EmptyRecipient => "empty_recipient",
                ValidationError::InvalidDelayRange { .. } => "invalid_delay_range",
                ValidationError::OutOfRange { .. } => "out_of_range",
            },
            Error::Transport(e) => match e {
                TransportError::Rejected { .. } => "message_rejected",
                TransportError::Unauthorized { .. } => "provider_unauthorized",
                TransportError::Unavailable { .. } => "provider_unavailable",
                TransportError::Network(_) => "network_error",
                TransportError::MalformedResponse(_) => "malformed_response",
            },
            Error::Concurrency(_) => "concurrency_error",
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Validation(ValidationError::OutOfRange {
                field,
                value,
                min,
                max,
            }) => Some(serde_json::json!({
                "field": field,
                "value": value,
                "min": min,
                "max": max,
            })),
            Error::Validation(ValidationError::InvalidDelayRange { min_ms, max_ms }) => {
                Some(serde_json::json!({
                    "min_delay_ms": min_ms,
                    "max_delay_ms": max_ms,
                }))
            }
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            _ => None,
        };

        Self {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

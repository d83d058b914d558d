//! Error types for instacore
//!
//! `Error` is what internal code propagates with `?`. Public operations never
//! return it directly: feature operations fold it into an [`ErrorInfo`] and
//! hand that back inside a [`ResultEnvelope`](crate::envelope::ResultEnvelope).

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The main error type for instacore
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Unexpected response HTTP {status}: {body}")]
    UnexpectedResponse { status: u16, body: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    // ============================================================================
    // Control Flow
    // ============================================================================
    #[error("Operation cancelled")]
    Cancelled,

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an unexpected response error
    pub fn unexpected_response(status: u16, body: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(e) if e.is_builder() => ErrorKind::InvalidRequest,
            Error::Transport(e) if e.is_decode() => ErrorKind::Decode,
            Error::Transport(_) | Error::Timeout { .. } => ErrorKind::Transport,
            Error::UnexpectedResponse { .. } => ErrorKind::UnexpectedResponse,
            Error::InvalidRequest { .. } | Error::InvalidUrl(_) => ErrorKind::InvalidRequest,
            Error::JsonParse(_) | Error::Decode { .. } => ErrorKind::Decode,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Config { .. } | Error::InvalidConfigValue { .. } | Error::YamlParse(_) => {
                ErrorKind::Config
            }
            Error::Io(_) | Error::Other(_) | Error::Anyhow(_) => ErrorKind::Unknown,
        }
    }

    /// Check if this error is retryable
    ///
    /// Only transport-level failures qualify. A received response is never
    /// retried, whatever its status.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout { .. } => true,
            Error::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::UnexpectedResponse { status, .. } => Some(*status),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for instacore
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

// ============================================================================
// ErrorInfo
// ============================================================================

/// Failure category reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection or timeout failure while sending
    Transport,
    /// A response arrived with a status outside the expected range
    UnexpectedResponse,
    /// Malformed or schema-mismatched response body
    Decode,
    /// Aborted through a cancellation token
    Cancelled,
    /// The request could not be built
    InvalidRequest,
    /// Bad client configuration
    Config,
    /// Anything else
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Transport => "transport",
            ErrorKind::UnexpectedResponse => "unexpected_response",
            ErrorKind::Decode => "decode",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Config => "config",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Diagnostic payload of a failed envelope
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Failure category
    pub kind: ErrorKind,
    /// Human readable message
    pub message: String,
    /// HTTP status, when a response was received
    pub http_status: Option<u16>,
    /// Raw response body, when a response was received
    pub raw_body: Option<String>,
    /// Underlying error
    pub cause: Option<Arc<Error>>,
}

impl ErrorInfo {
    /// Create an error info without a cause
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
            raw_body: None,
            cause: None,
        }
    }

    /// Info for a non-success response
    pub fn unexpected_response(status: u16, raw_body: impl Into<String>) -> Self {
        let raw_body = raw_body.into();
        Self {
            kind: ErrorKind::UnexpectedResponse,
            message: format!("unexpected response status {status}"),
            http_status: Some(status),
            raw_body: Some(raw_body),
            cause: None,
        }
    }

    /// Attach the raw response body
    #[must_use]
    pub fn with_raw_body(mut self, body: impl Into<String>) -> Self {
        self.raw_body = Some(body.into());
        self
    }

    /// Attach an HTTP status
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Check the failure category
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl From<Error> for ErrorInfo {
    fn from(error: Error) -> Self {
        let raw_body = match &error {
            Error::UnexpectedResponse { body, .. } => Some(body.clone()),
            _ => None,
        };
        Self {
            kind: error.kind(),
            message: error.to_string(),
            http_status: error.http_status(),
            raw_body,
            cause: Some(Arc::new(error)),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.http_status {
            Some(status) => write!(f, "[{}] HTTP {status}: {}", self.kind, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

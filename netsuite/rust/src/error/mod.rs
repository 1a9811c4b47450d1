//! NetSuite Error Types
//!
//! Error hierarchy for the read-only NetSuite integration. Fatal conditions
//! surface as [`NetSuiteError`]; per-record failures during a batch fetch are
//! reported as values (see [`crate::fetch::RecordFetchFailure`]).

use std::time::Duration;
use thiserror::Error;

use crate::signing::SigningError;

/// Result alias used throughout the crate.
pub type NetSuiteResult<T> = Result<T, NetSuiteError>;

/// Root error type for the NetSuite integration.
#[derive(Error, Debug)]
pub enum NetSuiteError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Read-only violation: {method} {endpoint} is not permitted")]
    ReadOnlyViolation { method: String, endpoint: String },

    #[error("Authentication failed ({status}): {message} [url: {url}]")]
    Authentication {
        status: u16,
        url: String,
        message: String,
        body: String,
    },

    #[error("NetSuite service unavailable ({status}): {message}")]
    TransientService {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("NetSuite API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl NetSuiteError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "NETSUITE_CONFIG",
            Self::ReadOnlyViolation { .. } => "NETSUITE_READ_ONLY",
            Self::Authentication { .. } => "NETSUITE_AUTH",
            Self::TransientService { .. } => "NETSUITE_UNAVAILABLE",
            Self::Api { .. } => "NETSUITE_API",
            Self::Network(_) => "NETSUITE_NETWORK",
            Self::Signing(_) => "NETSUITE_SIGNING",
            Self::InvalidResponse { .. } => "NETSUITE_INVALID_RESPONSE",
            Self::Storage { .. } => "NETSUITE_STORAGE",
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransientService { .. } => true,
            Self::Network(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Get retry-after duration if the server supplied one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::TransientService { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status associated with the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. }
            | Self::TransientService { status, .. }
            | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Map a non-success HTTP response to an error.
    ///
    /// 401/403 are authentication failures and carry the signed URL so a
    /// signature mismatch can be diagnosed. 429 and 5xx are transient.
    pub fn from_response(
        status: u16,
        url: &str,
        body: &str,
        retry_after: Option<Duration>,
    ) -> Self {
        let message = parse_error_message(body);
        match status {
            401 | 403 => Self::Authentication {
                status,
                url: url.to_string(),
                message,
                body: body.to_string(),
            },
            429 | 500..=599 => Self::TransientService {
                status,
                message,
                retry_after,
            },
            _ => Self::Api {
                status,
                message,
                body: body.to_string(),
            },
        }
    }
}

/// Extract a human-readable message from a NetSuite error body.
///
/// NetSuite reports errors as `{"title": .., "o:errorDetails": [{"detail": ..}]}`.
pub fn parse_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };

    let detail = value
        .get("o:errorDetails")
        .and_then(|d| d.get(0))
        .and_then(|d| d.get("detail"))
        .and_then(|d| d.as_str());

    detail
        .or_else(|| value.get("title").and_then(|t| t.as_str()))
        .or_else(|| value.get("message").and_then(|m| m.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing credential: {field}")]
    MissingCredential { field: String },

    #[error("Invalid auth method '{value}' (expected 'tba' or 'oauth2')")]
    InvalidAuthMode { value: String },

    #[error("Missing environment variable: {var}")]
    MissingEnv { var: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Network error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Failed to read response body: {message}")]
    Body { message: String },
}

impl NetworkError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::ConnectionFailed { .. })
    }
}

//! Signing error types.

use thiserror::Error;

/// Errors that can occur while producing an OAuth 1.0 signature.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The URL provided for signing could not be parsed.
    ///
    /// ```
    /// use integrations_netsuite::signing::SigningError;
    ///
    /// let error = SigningError::InvalidUrl {
    ///     message: "relative URL without a base".to_string(),
    /// };
    /// assert_eq!(error.to_string(), "Invalid URL: relative URL without a base");
    /// ```
    #[error("Invalid URL: {message}")]
    InvalidUrl {
        /// Details about what makes the URL invalid.
        message: String,
    },

    /// The HMAC could not be keyed.
    #[error("Signing failed: {message}")]
    SigningFailed {
        /// Underlying failure.
        message: String,
    },
}

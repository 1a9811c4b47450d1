//! Resilience patterns for NetSuite requests.
//!
//! Bounded exponential backoff with jitter. Only errors that report
//! [`is_retryable`](crate::error::NetSuiteError::is_retryable) (429, 5xx,
//! timeouts and connection failures) are retried.

mod retry;

pub use retry::{RetryConfig, RetryExecutor};

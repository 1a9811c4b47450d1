//! # NetSuite Integration Library
//!
//! A read-only NetSuite REST client with:
//! - OAuth 1.0 Token-Based Authentication (HMAC-SHA256) and OAuth 2.0
//!   client credentials
//! - A read-only gate: only GET requests ever leave the client
//! - Retry with exponential backoff for 429, 5xx and network failures
//! - Two-step fetch (list ids, then get each complete record) with
//!   per-record failure isolation
//! - Field classification with history-preserving custom-field merge
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use integrations_netsuite::{FetchOptions, NetSuiteClient, NetSuiteConfig, TwoStepFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NetSuiteConfig::builder()
//!         .account_id("1234567_SB1")
//!         .tba("consumer-key", "consumer-secret", "token-id", "token-secret")
//!         .build()?;
//!
//!     let client = Arc::new(NetSuiteClient::new(config)?);
//!     let fetcher = TwoStepFetcher::new(client);
//!
//!     let report = fetcher.fetch_all("vendor", &FetchOptions::new()).await?;
//!     println!("{} vendors, {} skipped", report.records.len(), report.skipped());
//!
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod error;
pub mod types;

// Request signing and authentication
pub mod auth;
pub mod signing;

// HTTP client and transport
pub mod client;
pub mod transport;

// Resilience patterns
pub mod resilience;

// Record retrieval and processing
pub mod fetch;
pub mod fields;
pub mod sync;

// Observability
pub mod observability;

pub use auth::{create_auth_provider, AuthProvider, OAuth2AuthProvider, TbaAuthProvider};
pub use client::{NetSuiteClient, ALLOWED_HTTP_METHODS};
pub use config::{AuthMode, Credentials, NetSuiteConfig, NetSuiteConfigBuilder};
pub use error::{ConfigurationError, NetSuiteError, NetSuiteResult, NetworkError};
pub use fetch::{FetchOptions, FetchReport, RecordFetchFailure, TwoStepFetcher};
pub use fields::{
    merge, split, ClassifiedRecord, CustomFieldEnvelope, CustomFieldMap, FieldClassifier,
    KnownFieldSet, SplitRecord,
};
pub use observability::{LoggingConfig, Metrics};
pub use resilience::RetryConfig;
pub use sync::{InMemoryRecordRepository, RecordRepository, SyncEngine, SyncOptions, SyncReport};
pub use transport::{HttpMethod, HttpTransport, MockHttpTransport, ReqwestHttpTransport};
pub use types::{ListQuery, ListResponse, Record};

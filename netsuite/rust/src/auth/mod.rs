//! Authentication providers.
//!
//! A provider turns `(url, method)` into the headers that authenticate one
//! request. TBA signs every request individually; OAuth 2.0 attaches a cached
//! bearer token.

mod oauth2;
mod tba;

pub use oauth2::{BearerToken, OAuth2AuthProvider};
pub use tba::TbaAuthProvider;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{AuthMode, NetSuiteConfig};
use crate::error::NetSuiteResult;
use crate::transport::{HttpMethod, HttpTransport};

/// Header name carrying credentials.
pub const AUTHORIZATION: &str = "Authorization";

/// Produces authentication headers for a request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Headers for a request to `url`. `url` must be the full URL that will
    /// be sent, query string included.
    async fn auth_headers(
        &self,
        url: &str,
        method: HttpMethod,
    ) -> NetSuiteResult<HashMap<String, String>>;

    fn mode(&self) -> AuthMode;
}

/// Build the provider selected by the configured credentials.
pub fn create_auth_provider(
    config: &NetSuiteConfig,
    transport: Arc<dyn HttpTransport>,
) -> NetSuiteResult<Arc<dyn AuthProvider>> {
    let provider: Arc<dyn AuthProvider> = match config.auth_mode() {
        AuthMode::Tba => Arc::new(TbaAuthProvider::from_config(config)?),
        AuthMode::OAuth2 => Arc::new(OAuth2AuthProvider::from_config(config, transport)?),
    };

    tracing::debug!(auth_mode = %provider.mode(), "Created auth provider");
    Ok(provider)
}

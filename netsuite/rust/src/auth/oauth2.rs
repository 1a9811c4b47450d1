//! OAuth 2.0 client-credentials provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{AuthProvider, AUTHORIZATION};
use crate::config::{AuthMode, Credentials, NetSuiteConfig};
use crate::error::{ConfigurationError, NetSuiteError, NetSuiteResult};
use crate::transport::{HttpMethod, HttpRequest, HttpTransport};

/// Lifetime assumed when the token response omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// A cached bearer token.
#[derive(Clone)]
pub struct BearerToken {
    pub access_token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl BearerToken {
    /// True once `now` is within `buffer` of expiry.
    pub fn needs_refresh(&self, buffer: Duration, now: DateTime<Utc>) -> bool {
        let buffer = chrono::Duration::from_std(buffer).unwrap_or_else(|_| chrono::Duration::zero());
        now >= self.expires_at - buffer
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Attaches a bearer token obtained with the client-credentials grant.
///
/// The token is cached per provider instance and refreshed shortly before
/// expiry. The cache lock is held across the exchange, so concurrent callers
/// wait for a single refresh instead of each requesting a token.
pub struct OAuth2AuthProvider {
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    refresh_buffer: Duration,
    timeout: Duration,
    transport: Arc<dyn HttpTransport>,
    cache: Mutex<Option<BearerToken>>,
}

impl OAuth2AuthProvider {
    pub fn new(
        token_url: impl Into<String>,
        credentials: &Credentials,
        transport: Arc<dyn HttpTransport>,
    ) -> NetSuiteResult<Self> {
        credentials.validate()?;

        let (client_id, client_secret) = match credentials {
            Credentials::OAuth2 {
                client_id,
                client_secret,
            } => (client_id.clone(), client_secret.clone()),
            Credentials::Tba { .. } => {
                return Err(ConfigurationError::InvalidConfig {
                    message: "OAuth2 provider requires client credentials".to_string(),
                }
                .into())
            }
        };

        Ok(Self {
            token_url: token_url.into(),
            client_id,
            client_secret,
            refresh_buffer: crate::config::DEFAULT_TOKEN_REFRESH_BUFFER,
            timeout: crate::config::DEFAULT_TIMEOUT,
            transport,
            cache: Mutex::new(None),
        })
    }

    pub fn from_config(
        config: &NetSuiteConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> NetSuiteResult<Self> {
        let mut provider = Self::new(config.token_url(), &config.credentials, transport)?;
        provider.refresh_buffer = config.token_refresh_buffer;
        provider.timeout = config.timeout;
        Ok(provider)
    }

    pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    /// Current access token, refreshing it if needed.
    pub async fn access_token(&self) -> NetSuiteResult<SecretString> {
        let mut cache = self.cache.lock().await;

        if let Some(token) = cache.as_ref() {
            if !token.needs_refresh(self.refresh_buffer, Utc::now()) {
                return Ok(token.access_token.clone());
            }
            tracing::debug!(expires_at = %token.expires_at, "Refreshing OAuth2 token");
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *cache = Some(token);
        Ok(access_token)
    }

    /// Drop the cached token.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    async fn request_token(&self) -> NetSuiteResult<BearerToken> {
        let body = serde_urlencoded::to_string([
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret().as_str()),
        ])
        .map_err(|e| ConfigurationError::InvalidConfig {
            message: format!("cannot encode token request: {}", e),
        })?;

        let mut headers = HashMap::new();
        headers.insert(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        headers.insert("Accept".to_string(), "application/json".to_string());

        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.token_url.clone(),
            headers,
            body: Some(body),
            timeout: Some(self.timeout),
        };

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(NetSuiteError::from_response(
                response.status,
                &self.token_url,
                &response.body,
                response.retry_after(),
            ));
        }

        let parsed: TokenResponse =
            serde_json::from_str(&response.body).map_err(|e| NetSuiteError::InvalidResponse {
                message: format!("invalid token response: {}", e),
            })?;

        let expires_in = parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS).max(0);
        let expires_at = chrono::Duration::try_seconds(expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| NetSuiteError::InvalidResponse {
                message: format!("token expires_in out of range: {}", expires_in),
            })?;

        tracing::info!(expires_in = expires_in, "Obtained OAuth2 access token");

        Ok(BearerToken {
            access_token: SecretString::new(parsed.access_token),
            expires_at,
        })
    }
}

#[async_trait]
impl AuthProvider for OAuth2AuthProvider {
    async fn auth_headers(
        &self,
        _url: &str,
        _method: HttpMethod,
    ) -> NetSuiteResult<HashMap<String, String>> {
        let token = self.access_token().await?;
        let mut headers = HashMap::new();
        headers.insert(
            AUTHORIZATION.to_string(),
            format!("Bearer {}", token.expose_secret()),
        );
        Ok(headers)
    }

    fn mode(&self) -> AuthMode {
        AuthMode::OAuth2
    }
}

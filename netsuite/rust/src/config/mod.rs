//! Configuration for the NetSuite client.
//!
//! Credentials are loaded once (builder or environment) and are immutable
//! afterwards. Secrets are wrapped in [`SecretString`] and never printed.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::ConfigurationError;
use crate::resilience::RetryConfig;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default list page size.
pub const DEFAULT_PAGE_SIZE: u32 = 100;
/// Largest page size NetSuite accepts on list endpoints.
pub const MAX_PAGE_SIZE: u32 = 1000;
/// Default number of per-record fetches in flight.
pub const DEFAULT_CONCURRENCY: usize = 1;
/// Bearer tokens are refreshed this long before they expire.
pub const DEFAULT_TOKEN_REFRESH_BUFFER: Duration = Duration::from_secs(60);

/// Environment variable names.
pub mod env {
    pub const AUTH_METHOD: &str = "NS_AUTH_METHOD";
    pub const ACCOUNT_ID: &str = "NS_ACCOUNT_ID";
    pub const CONSUMER_KEY: &str = "NS_CONSUMER_KEY";
    pub const CONSUMER_SECRET: &str = "NS_CONSUMER_SECRET";
    pub const TOKEN_ID: &str = "NS_TOKEN_ID";
    pub const TOKEN_SECRET: &str = "NS_TOKEN_SECRET";
    pub const CLIENT_ID: &str = "NS_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "NS_CLIENT_SECRET";
    pub const BASE_URL: &str = "NS_BASE_URL";
    pub const PAGE_SIZE: &str = "NS_PAGE_SIZE";
    pub const MAX_RETRIES: &str = "NS_MAX_RETRIES";
    pub const RETRY_DELAY_SECS: &str = "NS_RETRY_DELAY_SECS";
    pub const TIMEOUT_SECS: &str = "NS_TIMEOUT_SECS";
}

/// Authentication mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// OAuth 1.0 Token-Based Authentication.
    Tba,
    /// OAuth 2.0 client credentials.
    OAuth2,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tba => "tba",
            Self::OAuth2 => "oauth2",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tba" => Ok(Self::Tba),
            "oauth2" => Ok(Self::OAuth2),
            _ => Err(ConfigurationError::InvalidAuthMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Credential set for one authentication mode.
#[derive(Clone)]
pub enum Credentials {
    Tba {
        consumer_key: SecretString,
        consumer_secret: SecretString,
        token_id: SecretString,
        token_secret: SecretString,
    },
    OAuth2 {
        client_id: String,
        client_secret: SecretString,
    },
}

impl Credentials {
    pub fn tba(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        token_id: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Self {
        Self::Tba {
            consumer_key: SecretString::new(consumer_key.into()),
            consumer_secret: SecretString::new(consumer_secret.into()),
            token_id: SecretString::new(token_id.into()),
            token_secret: SecretString::new(token_secret.into()),
        }
    }

    pub fn oauth2(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::OAuth2 {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
        }
    }

    pub fn mode(&self) -> AuthMode {
        match self {
            Self::Tba { .. } => AuthMode::Tba,
            Self::OAuth2 { .. } => AuthMode::OAuth2,
        }
    }

    /// Every field of the set must be non-empty.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let fields: Vec<(&str, &str)> = match self {
            Self::Tba {
                consumer_key,
                consumer_secret,
                token_id,
                token_secret,
            } => vec![
                ("consumer_key", consumer_key.expose_secret().as_str()),
                ("consumer_secret", consumer_secret.expose_secret().as_str()),
                ("token_id", token_id.expose_secret().as_str()),
                ("token_secret", token_secret.expose_secret().as_str()),
            ],
            Self::OAuth2 {
                client_id,
                client_secret,
            } => vec![
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.expose_secret().as_str()),
            ],
        };

        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(ConfigurationError::MissingCredential {
                field: field.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tba { .. } => f
                .debug_struct("Tba")
                .field("consumer_key", &"[REDACTED]")
                .field("consumer_secret", &"[REDACTED]")
                .field("token_id", &"[REDACTED]")
                .field("token_secret", &"[REDACTED]")
                .finish(),
            Self::OAuth2 { client_id, .. } => f
                .debug_struct("OAuth2")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .finish(),
        }
    }
}

/// NetSuite client configuration.
#[derive(Debug, Clone)]
pub struct NetSuiteConfig {
    /// Account id as issued, e.g. `1234567_SB1`. Used verbatim as the OAuth realm.
    pub account_id: String,
    pub credentials: Credentials,
    /// Overrides the `https://{account}.suitetalk.api.netsuite.com/services/rest` root.
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub page_size: u32,
    pub concurrency: usize,
    pub retry: RetryConfig,
    pub token_refresh_buffer: Duration,
}

impl NetSuiteConfig {
    pub fn builder() -> NetSuiteConfigBuilder {
        NetSuiteConfigBuilder::new()
    }

    /// Load configuration from `NS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let require = |var: &str| {
            get(var).ok_or_else(|| ConfigurationError::MissingEnv {
                var: var.to_string(),
            })
        };

        let mode = match get(env::AUTH_METHOD) {
            Some(value) => value.parse::<AuthMode>()?,
            None => AuthMode::Tba,
        };

        let credentials = match mode {
            AuthMode::Tba => Credentials::tba(
                require(env::CONSUMER_KEY)?,
                require(env::CONSUMER_SECRET)?,
                require(env::TOKEN_ID)?,
                require(env::TOKEN_SECRET)?,
            ),
            AuthMode::OAuth2 => {
                Credentials::oauth2(require(env::CLIENT_ID)?, require(env::CLIENT_SECRET)?)
            }
        };

        let mut builder = NetSuiteConfig::builder()
            .account_id(require(env::ACCOUNT_ID)?)
            .credentials(credentials);

        if let Some(base_url) = get(env::BASE_URL) {
            builder = builder.base_url(base_url);
        }
        if let Some(page_size) = get(env::PAGE_SIZE) {
            builder = builder.page_size(parse_number(env::PAGE_SIZE, &page_size)?);
        }
        if let Some(timeout) = get(env::TIMEOUT_SECS) {
            builder = builder.timeout(Duration::from_secs(parse_number(
                env::TIMEOUT_SECS,
                &timeout,
            )?));
        }

        let mut retry = RetryConfig::default();
        if let Some(retries) = get(env::MAX_RETRIES) {
            retry.max_attempts = parse_number(env::MAX_RETRIES, &retries)?;
        }
        if let Some(delay) = get(env::RETRY_DELAY_SECS) {
            retry.initial_delay =
                Duration::from_secs(parse_number(env::RETRY_DELAY_SECS, &delay)?);
        }

        builder.retry(retry).build()
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.credentials.mode()
    }

    /// Account id as it appears in hostnames: lower-cased, `_` becomes `-`.
    pub fn host_account_id(&self) -> String {
        self.account_id.to_ascii_lowercase().replace('_', "-")
    }

    /// REST root, e.g. `https://1234567-sb1.suitetalk.api.netsuite.com/services/rest`.
    pub fn rest_root(&self) -> String {
        match &self.base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!(
                "https://{}.suitetalk.api.netsuite.com/services/rest",
                self.host_account_id()
            ),
        }
    }

    /// Record API base: `{rest_root}/record/v1`.
    pub fn record_base_url(&self) -> String {
        format!("{}/record/v1", self.rest_root())
    }

    /// OAuth 2.0 token endpoint.
    pub fn token_url(&self) -> String {
        format!("{}/auth/oauth2/v1/token", self.rest_root())
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.account_id.trim().is_empty() {
            return Err(ConfigurationError::MissingCredential {
                field: "account_id".to_string(),
            });
        }

        self.credentials.validate()?;

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigurationError::InvalidConfig {
                message: format!(
                    "page_size must be between 1 and {}, got {}",
                    MAX_PAGE_SIZE, self.page_size
                ),
            });
        }

        if self.concurrency == 0 {
            return Err(ConfigurationError::InvalidConfig {
                message: "concurrency must be at least 1".to_string(),
            });
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigurationError::InvalidConfig {
                message: "retry.max_attempts must be at least 1".to_string(),
            });
        }

        if let Some(base_url) = &self.base_url {
            Url::parse(base_url).map_err(|e| ConfigurationError::InvalidConfig {
                message: format!("invalid base_url '{}': {}", base_url, e),
            })?;
        }

        Ok(())
    }
}

fn parse_number<T: FromStr>(var: &str, value: &str) -> Result<T, ConfigurationError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigurationError::InvalidConfig {
            message: format!("{} must be a non-negative integer, got '{}'", var, value),
        })
}

/// Builder for [`NetSuiteConfig`].
#[derive(Debug, Default)]
pub struct NetSuiteConfigBuilder {
    account_id: Option<String>,
    credentials: Option<Credentials>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    page_size: Option<u32>,
    concurrency: Option<usize>,
    retry: Option<RetryConfig>,
    token_refresh_buffer: Option<Duration>,
}

impl NetSuiteConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Use Token-Based Authentication.
    pub fn tba(
        self,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        token_id: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Self {
        self.credentials(Credentials::tba(
            consumer_key,
            consumer_secret,
            token_id,
            token_secret,
        ))
    }

    /// Use OAuth 2.0 client credentials.
    pub fn oauth2(self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.credentials(Credentials::oauth2(client_id, client_secret))
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn token_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.token_refresh_buffer = Some(buffer);
        self
    }

    pub fn build(self) -> Result<NetSuiteConfig, ConfigurationError> {
        let account_id = self
            .account_id
            .ok_or_else(|| ConfigurationError::MissingCredential {
                field: "account_id".to_string(),
            })?;
        let credentials =
            self.credentials
                .ok_or_else(|| ConfigurationError::MissingCredential {
                    field: "credentials".to_string(),
                })?;

        let config = NetSuiteConfig {
            account_id,
            credentials,
            base_url: self.base_url,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            concurrency: self.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            retry: self.retry.unwrap_or_default(),
            token_refresh_buffer: self
                .token_refresh_buffer
                .unwrap_or(DEFAULT_TOKEN_REFRESH_BUFFER),
        };

        config.validate()?;
        Ok(config)
    }
}

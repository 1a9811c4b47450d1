//! OAuth 1.0 Token-Based Authentication provider.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

use super::{AuthProvider, AUTHORIZATION};
use crate::config::{AuthMode, Credentials, NetSuiteConfig};
use crate::error::{ConfigurationError, NetSuiteResult};
use crate::signing::{authorization_header, sign_request};
use crate::transport::HttpMethod;

/// Signs every request with a fresh nonce and timestamp. Performs no I/O.
pub struct TbaAuthProvider {
    realm: String,
    consumer_key: SecretString,
    consumer_secret: SecretString,
    token_id: SecretString,
    token_secret: SecretString,
}

impl TbaAuthProvider {
    /// `account_id` is used verbatim as the OAuth realm.
    pub fn new(account_id: impl Into<String>, credentials: &Credentials) -> NetSuiteResult<Self> {
        let realm = account_id.into();
        if realm.trim().is_empty() {
            return Err(ConfigurationError::MissingCredential {
                field: "account_id".to_string(),
            }
            .into());
        }

        credentials.validate()?;

        match credentials {
            Credentials::Tba {
                consumer_key,
                consumer_secret,
                token_id,
                token_secret,
            } => Ok(Self {
                realm,
                consumer_key: consumer_key.clone(),
                consumer_secret: consumer_secret.clone(),
                token_id: token_id.clone(),
                token_secret: token_secret.clone(),
            }),
            Credentials::OAuth2 { .. } => Err(ConfigurationError::InvalidConfig {
                message: "TBA provider requires TBA credentials".to_string(),
            }
            .into()),
        }
    }

    pub fn from_config(config: &NetSuiteConfig) -> NetSuiteResult<Self> {
        Self::new(config.account_id.clone(), &config.credentials)
    }
}

#[async_trait]
impl AuthProvider for TbaAuthProvider {
    async fn auth_headers(
        &self,
        url: &str,
        method: HttpMethod,
    ) -> NetSuiteResult<HashMap<String, String>> {
        let signed = sign_request(
            method.as_str(),
            url,
            self.consumer_key.expose_secret(),
            self.token_id.expose_secret(),
            self.consumer_secret.expose_secret(),
            self.token_secret.expose_secret(),
        )?;

        let mut headers = HashMap::new();
        headers.insert(
            AUTHORIZATION.to_string(),
            authorization_header(&self.realm, &signed),
        );
        Ok(headers)
    }

    fn mode(&self) -> AuthMode {
        AuthMode::Tba
    }
}

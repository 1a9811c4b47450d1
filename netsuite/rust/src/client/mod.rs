//! Read-only NetSuite REST client.
//!
//! Every request passes the read-only gate before anything else happens.
//! The full URL, query string included, is built before authentication
//! headers are requested, so the string that is signed is the string that is
//! sent. Each attempt (retries included) is signed afresh.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::auth::{create_auth_provider, AuthProvider};
use crate::config::{AuthMode, NetSuiteConfig};
use crate::error::{ConfigurationError, NetSuiteError, NetSuiteResult};
use crate::observability::Metrics;
use crate::resilience::RetryExecutor;
use crate::transport::{HttpMethod, HttpRequest, HttpTransport, ReqwestHttpTransport};
use crate::types::{ListQuery, ListResponse, Record};

/// Methods the client will send. Everything else is rejected locally.
pub const ALLOWED_HTTP_METHODS: &[HttpMethod] = &[HttpMethod::Get];

/// Query parameters as ordered key/value pairs.
pub type QueryParams = [(String, String)];

/// Read-only NetSuite REST client.
pub struct NetSuiteClient {
    config: NetSuiteConfig,
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    auth: Arc<dyn AuthProvider>,
    retry: RetryExecutor,
    metrics: Arc<Metrics>,
}

impl NetSuiteClient {
    /// Create a client backed by reqwest.
    pub fn new(config: NetSuiteConfig) -> NetSuiteResult<Self> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestHttpTransport::new(config.timeout)?);
        Self::with_transport(config, transport)
    }

    /// Create a client over a custom transport; the auth provider is chosen
    /// from the configured credentials.
    pub fn with_transport(
        config: NetSuiteConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> NetSuiteResult<Self> {
        config.validate()?;
        let auth = create_auth_provider(&config, transport.clone())?;
        Ok(Self::with_auth_provider(config, transport, auth))
    }

    pub fn with_auth_provider(
        config: NetSuiteConfig,
        transport: Arc<dyn HttpTransport>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let metrics = Arc::new(Metrics::new());
        let retry = RetryExecutor::new(config.retry.clone()).with_metrics(metrics.clone());

        Self {
            base_url: config.record_base_url(),
            config,
            transport,
            auth,
            retry,
            metrics,
        }
    }

    pub fn config(&self) -> &NetSuiteConfig {
        &self.config
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth.mode()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// `{record_base}/{endpoint}?{params}`, form-encoded.
    pub fn build_url(&self, endpoint: &str, params: &QueryParams) -> NetSuiteResult<String> {
        let mut url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));

        if !params.is_empty() {
            let query =
                serde_urlencoded::to_string(params).map_err(|e| ConfigurationError::InvalidConfig {
                    message: format!("cannot encode query parameters: {}", e),
                })?;
            url.push('?');
            url.push_str(&query);
        }

        Ok(url)
    }

    /// Perform a request against a record endpoint and return the parsed body.
    ///
    /// Non-GET methods fail with [`NetSuiteError::ReadOnlyViolation`] before
    /// any header generation or network activity.
    pub async fn request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: &QueryParams,
    ) -> NetSuiteResult<Value> {
        if !ALLOWED_HTTP_METHODS.contains(&method) {
            self.metrics.record_read_only_rejection();
            tracing::error!(
                method = %method,
                endpoint = endpoint,
                "Blocked non-read request"
            );
            return Err(NetSuiteError::ReadOnlyViolation {
                method: method.to_string(),
                endpoint: endpoint.to_string(),
            });
        }

        let full_url = self.build_url(endpoint, params)?;
        self.retry
            .execute(|| self.send_once(method, &full_url))
            .await
    }

    async fn send_once(&self, method: HttpMethod, full_url: &str) -> NetSuiteResult<Value> {
        let mut headers: HashMap<String, String> = self.auth.auth_headers(full_url, method).await?;
        headers.insert("Accept".to_string(), "application/json".to_string());

        let request = HttpRequest {
            method,
            url: full_url.to_string(),
            headers,
            body: None,
            timeout: Some(self.config.timeout),
        };

        tracing::debug!(method = %method, url = full_url, "Sending request");
        self.metrics.record_request();
        let started = Instant::now();

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                self.metrics.record_failure();
                return Err(e);
            }
        };

        tracing::debug!(
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Received response"
        );

        if !response.is_success() {
            self.metrics.record_failure();
            return Err(NetSuiteError::from_response(
                response.status,
                full_url,
                &response.body,
                response.retry_after(),
            ));
        }

        self.metrics.record_success();

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response.body).map_err(|e| NetSuiteError::InvalidResponse {
            message: format!("response from {} is not JSON: {}", full_url, e),
        })
    }

    /// Fetch one complete record. `fields` restricts the returned fields.
    pub async fn get_record(
        &self,
        record_type: &str,
        id: &str,
        fields: Option<&[&str]>,
    ) -> NetSuiteResult<Record> {
        let mut params = Vec::new();
        if let Some(fields) = fields.filter(|f| !f.is_empty()) {
            params.push(("fields".to_string(), fields.join(",")));
        }

        let endpoint = format!("{}/{}", record_type, id);
        match self.request(HttpMethod::Get, &endpoint, &params).await? {
            Value::Object(record) => Ok(record),
            other => Err(NetSuiteError::InvalidResponse {
                message: format!(
                    "expected a JSON object for {} {}, got {}",
                    record_type,
                    id,
                    json_kind(&other)
                ),
            }),
        }
    }

    /// Fetch one page of a record list.
    pub async fn query_records(
        &self,
        record_type: &str,
        query: &ListQuery,
    ) -> NetSuiteResult<ListResponse> {
        let value = self
            .request(HttpMethod::Get, record_type, &query.to_params())
            .await?;

        serde_json::from_value(value).map_err(|e| NetSuiteError::InvalidResponse {
            message: format!("invalid list response for {}: {}", record_type, e),
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

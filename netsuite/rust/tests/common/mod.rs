//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use integrations_netsuite::signing::compute_signature;
use integrations_netsuite::{NetSuiteClient, NetSuiteConfig, RetryConfig};
use percent_encoding::percent_decode_str;
use serde_json::{json, Value};
use wiremock::{Match, MockServer, Request};

pub const ACCOUNT_ID: &str = "1234567_SB1";
pub const CONSUMER_SECRET: &str = "consumer-secret";
pub const TOKEN_SECRET: &str = "token-secret";

pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(10),
        multiplier: 2.0,
        jitter: 0.0,
    }
}

pub fn tba_config(server: &MockServer, retry: RetryConfig) -> NetSuiteConfig {
    NetSuiteConfig::builder()
        .account_id(ACCOUNT_ID)
        .tba("consumer-key", CONSUMER_SECRET, "token-id", TOKEN_SECRET)
        .base_url(server.uri())
        .retry(retry)
        .build()
        .unwrap()
}

pub fn tba_client(server: &MockServer, retry: RetryConfig) -> Arc<NetSuiteClient> {
    Arc::new(NetSuiteClient::new(tba_config(server, retry)).unwrap())
}

/// A NetSuite list page.
pub fn list_page(ids: &[&str], offset: u64, has_more: bool) -> Value {
    let items: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "links": [{"rel": "self", "href": format!("https://x/vendor/{}", id)}]}))
        .collect();
    json!({
        "links": [],
        "count": ids.len(),
        "hasMore": has_more,
        "items": items,
        "offset": offset,
    })
}

/// Matches requests whose OAuth 1.0 signature verifies against the URL
/// the server actually received, query string included.
pub struct ValidTbaSignature {
    base_uri: String,
}

impl ValidTbaSignature {
    pub fn new(server: &MockServer) -> Self {
        Self {
            base_uri: server.uri(),
        }
    }
}

impl Match for ValidTbaSignature {
    fn matches(&self, request: &Request) -> bool {
        let Some(header) = request
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
        else {
            return false;
        };
        let Some(params) = header.strip_prefix("OAuth ") else {
            return false;
        };

        let mut oauth_params = Vec::new();
        let mut signature = None;
        let mut realm = None;
        for part in params.split(", ") {
            let Some((key, quoted)) = part.split_once('=') else {
                return false;
            };
            let value = percent_decode_str(quoted.trim_matches('"'))
                .decode_utf8_lossy()
                .to_string();
            match key {
                "realm" => realm = Some(value),
                "oauth_signature" => signature = Some(value),
                _ => oauth_params.push((key.to_string(), value)),
            }
        }

        if realm.as_deref() != Some(ACCOUNT_ID) {
            return false;
        }

        let mut url = format!("{}{}", self.base_uri, request.url.path());
        if let Some(query) = request.url.query() {
            url.push('?');
            url.push_str(query);
        }

        let method = request.method.to_string();
        match compute_signature(&method, &url, &oauth_params, CONSUMER_SECRET, TOKEN_SECRET) {
            Ok(expected) => signature.as_deref() == Some(expected.as_str()),
            Err(_) => false,
        }
    }
}

//! OAuth 1.0 HMAC-SHA256 signature engine.

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::RngCore;
use sha2::Sha256;
use url::Url;

use super::error::SigningError;

type HmacSha256 = Hmac<Sha256>;

/// Signature method advertised in `oauth_signature_method`.
pub const SIGNATURE_METHOD: &str = "HMAC-SHA256";

/// Protocol version advertised in `oauth_version`.
pub const OAUTH_VERSION: &str = "1.0";

/// RFC 3986 unreserved characters stay literal; everything else is `%XX`.
const UNRESERVED_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a string per RFC 3986 (space becomes `%20`, never `+`).
///
/// ```
/// use integrations_netsuite::signing::percent_encode;
///
/// assert_eq!(percent_encode("a b&c"), "a%20b%26c");
/// assert_eq!(percent_encode("Az09-._~"), "Az09-._~");
/// ```
pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, UNRESERVED_SET).to_string()
}

/// Generate a nonce: 16 bytes from the thread CSPRNG, hex encoded.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// OAuth protocol parameters for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthParams {
    pub consumer_key: String,
    pub token: String,
    pub nonce: String,
    pub timestamp: i64,
}

impl OAuthParams {
    /// Create parameters stamped with a fresh nonce and the current time.
    pub fn new(consumer_key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            token: token.into(),
            nonce: generate_nonce(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Create parameters with a fixed nonce and timestamp.
    pub fn with_nonce_and_timestamp(
        consumer_key: impl Into<String>,
        token: impl Into<String>,
        nonce: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            token: token.into(),
            nonce: nonce.into(),
            timestamp,
        }
    }

    /// The six base OAuth parameters, excluding `oauth_signature`.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_token".to_string(), self.token.clone()),
            (
                "oauth_signature_method".to_string(),
                SIGNATURE_METHOD.to_string(),
            ),
            ("oauth_timestamp".to_string(), self.timestamp.to_string()),
            ("oauth_nonce".to_string(), self.nonce.clone()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ]
    }
}

/// The base string URI: lower-cased scheme and host, non-default port, path.
/// Query and fragment are excluded.
pub fn base_string_uri(url: &Url) -> Result<String, SigningError> {
    let host = url.host_str().ok_or_else(|| SigningError::InvalidUrl {
        message: format!("URL has no host: {}", url),
    })?;

    let mut uri = format!(
        "{}://{}",
        url.scheme().to_ascii_lowercase(),
        host.to_ascii_lowercase()
    );
    // `Url::port` is None when the port is the scheme default.
    if let Some(port) = url.port() {
        uri.push_str(&format!(":{}", port));
    }
    uri.push_str(url.path());
    Ok(uri)
}

/// Normalize OAuth parameters and the URL's decoded query parameters into
/// the signature parameter string.
///
/// Keys and values are encoded first, then sorted by encoded key and encoded
/// value, then joined as `k=v` pairs with `&`.
pub fn normalized_parameters(oauth_params: &[(String, String)], url: &Url) -> String {
    let mut encoded: Vec<(String, String)> = oauth_params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .chain(
            url.query_pairs()
                .map(|(k, v)| (percent_encode(&k), percent_encode(&v))),
        )
        .collect();

    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn parse_url(full_url: &str) -> Result<Url, SigningError> {
    Url::parse(full_url).map_err(|e| SigningError::InvalidUrl {
        message: format!("{}: {}", e, full_url),
    })
}

/// Build the signature base string `METHOD&enc(uri)&enc(params)`.
pub fn signature_base_string(
    method: &str,
    full_url: &str,
    oauth_params: &[(String, String)],
) -> Result<String, SigningError> {
    let url = parse_url(full_url)?;
    let uri = base_string_uri(&url)?;
    let params = normalized_parameters(oauth_params, &url);

    Ok(format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&uri),
        percent_encode(&params)
    ))
}

/// Compute the base64 HMAC-SHA256 signature for a request.
///
/// `full_url` must be the exact URL that will be sent, query string included.
pub fn compute_signature(
    method: &str,
    full_url: &str,
    oauth_params: &[(String, String)],
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String, SigningError> {
    let base_string = signature_base_string(method, full_url, oauth_params)?;
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );

    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).map_err(|e| SigningError::SigningFailed {
            message: e.to_string(),
        })?;
    mac.update(base_string.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// A signed request. Built per call and never reused.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: String,
    pub url: String,
    pub oauth_params: OAuthParams,
    pub signature: String,
}

/// Sign `full_url` with a fresh nonce and timestamp.
pub fn sign_request(
    method: &str,
    full_url: &str,
    consumer_key: &str,
    token_id: &str,
    consumer_secret: &str,
    token_secret: &str,
) -> Result<SignedRequest, SigningError> {
    let oauth_params = OAuthParams::new(consumer_key, token_id);
    let signature = compute_signature(
        method,
        full_url,
        &oauth_params.to_pairs(),
        consumer_secret,
        token_secret,
    )?;

    Ok(SignedRequest {
        method: method.to_ascii_uppercase(),
        url: full_url.to_string(),
        oauth_params,
        signature,
    })
}

/// Format the `Authorization` header value.
///
/// `realm` comes first and is not part of the signature; the OAuth
/// parameters follow sorted by name with percent-encoded values.
pub fn authorization_header(realm: &str, signed: &SignedRequest) -> String {
    let mut pairs = signed.oauth_params.to_pairs();
    pairs.push(("oauth_signature".to_string(), signed.signature.clone()));
    pairs.sort();

    let params = pairs
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("OAuth realm=\"{}\", {}", realm, params)
}

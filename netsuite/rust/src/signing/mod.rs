//! OAuth 1.0 request signing for NetSuite Token-Based Authentication.
//!
//! NetSuite TBA uses OAuth 1.0 with `HMAC-SHA256`. Every request carries a
//! fresh nonce and timestamp, and the signature covers the method, the base
//! URI, the OAuth protocol parameters and every query parameter of the URL
//! that is actually sent.
//!
//! # Components
//!
//! - **oauth1** - Parameter normalization, base string, HMAC signature and
//!   `Authorization` header formatting
//! - **error** - Error types for signing operations
//!
//! # Example
//!
//! ```
//! use integrations_netsuite::signing::{compute_signature, OAuthParams};
//!
//! let params = OAuthParams::with_nonce_and_timestamp("ck", "tok", "abc123", 1700000000);
//! let signature = compute_signature(
//!     "GET",
//!     "https://123456.suitetalk.api.netsuite.com/services/rest/record/v1/vendor?limit=5",
//!     &params.to_pairs(),
//!     "consumer-secret",
//!     "token-secret",
//! )
//! .unwrap();
//! assert!(!signature.is_empty());
//! ```

mod error;
mod oauth1;

pub use error::SigningError;
pub use oauth1::{
    authorization_header, base_string_uri, compute_signature, generate_nonce,
    normalized_parameters, percent_encode, sign_request, signature_base_string, OAuthParams,
    SignedRequest, OAUTH_VERSION, SIGNATURE_METHOD,
};

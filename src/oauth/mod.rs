//! OAuth1 request signing.
//!
//! The Connect OAuth service still speaks OAuth 1.0a for its first two token
//! exchanges. This module computes HMAC-SHA1 signatures and renders the
//! `Authorization: OAuth ...` header for them.
//!
//! # Example
//!
//! ```
//! use garmin_connect::oauth::{OAuth1Signer, OAuthConsumer, SignatureParameters, SigningInput};
//!
//! let consumer = OAuthConsumer::new("consumer-key", "consumer-secret");
//! let signer = OAuth1Signer::new(&consumer, "GET", None);
//! let mut params = SignatureParameters::new();
//! params.insert("ticket", "ST-0123");
//!
//! let input = SigningInput::fixed("nonce", "1700000000");
//! let header = signer.authorization_header("https://example.com/oauth", &params, &input);
//! assert!(header.starts_with("OAuth oauth_consumer_key=\"consumer-key\""));
//! ```

mod params;
mod signer;

pub use params::{SignatureParameters, oauth_urlencode};
pub use signer::{
    OAuth1Signer, OAuthConsumer, SIGNATURE_METHOD, SigningInput, TokenCredentials, hmac_sha1_base64,
};

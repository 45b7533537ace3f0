//! HMAC-SHA1 signature computation and `Authorization` header rendering.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha1::Sha1;
use tracing::trace;

use super::params::{SignatureParameters, oauth_urlencode};

type HmacSha1 = Hmac<Sha1>;

/// The only signature method the OAuth service accepts.
pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";

const OAUTH_VERSION: &str = "1.0";

/// OAuth consumer identity (key and secret) issued for the Connect mobile apps.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthConsumer {
    key: String,
    secret: String,
}

impl OAuthConsumer {
    /// Creates a consumer from its key and secret.
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// Returns the consumer key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the consumer secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for OAuthConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConsumer")
            .field("key", &self.key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Token and token secret used as the second half of the signing key.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenCredentials {
    /// Value sent as `oauth_token`.
    pub token: String,
    /// Secret appended to the signing key.
    pub secret: String,
}

impl TokenCredentials {
    /// Creates token credentials.
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for TokenCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCredentials")
            .field("token", &self.token)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Nonce and timestamp for one signature.
///
/// Missing values are generated at signing time; tests pin both with
/// [`SigningInput::fixed`] to get byte-identical headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningInput {
    /// Caller-supplied nonce.
    pub nonce: Option<String>,
    /// Caller-supplied Unix timestamp, in seconds.
    pub timestamp: Option<String>,
}

impl SigningInput {
    /// Pins both the nonce and the timestamp.
    pub fn fixed(nonce: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            nonce: Some(nonce.into()),
            timestamp: Some(timestamp.into()),
        }
    }

    fn resolve_nonce(&self) -> String {
        self.nonce.clone().unwrap_or_else(generate_nonce)
    }

    fn resolve_timestamp(&self) -> String {
        self.timestamp.clone().unwrap_or_else(current_timestamp)
    }
}

/// OAuth1 signer for one HTTP method, optionally bound to a token.
///
/// Signing is a pure function of its inputs: it never fails and never
/// touches the network.
#[derive(Debug, Clone)]
pub struct OAuth1Signer<'a> {
    consumer: &'a OAuthConsumer,
    method: String,
    token: Option<&'a TokenCredentials>,
}

impl<'a> OAuth1Signer<'a> {
    /// Creates a signer for `method` (case-insensitive).
    #[must_use]
    pub fn new(
        consumer: &'a OAuthConsumer,
        method: &str,
        token: Option<&'a TokenCredentials>,
    ) -> Self {
        Self {
            consumer,
            method: method.to_ascii_uppercase(),
            token,
        }
    }

    /// Generates the OAuth protocol parameters in header order.
    #[must_use]
    pub fn oauth_parameters(&self, input: &SigningInput) -> Vec<(String, String)> {
        let mut params = vec![
            ("oauth_consumer_key".to_string(), self.consumer.key.clone()),
            ("oauth_nonce".to_string(), input.resolve_nonce()),
            (
                "oauth_signature_method".to_string(),
                SIGNATURE_METHOD.to_string(),
            ),
            ("oauth_timestamp".to_string(), input.resolve_timestamp()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ];
        if let Some(token) = self.token {
            params.push(("oauth_token".to_string(), token.token.clone()));
        }
        params
    }

    /// Builds the signature base string: `METHOD&url&params`, each part encoded.
    #[must_use]
    pub fn base_string(&self, base_url: &str, parameters: &SignatureParameters) -> String {
        format!(
            "{}&{}&{}",
            oauth_urlencode(&self.method),
            oauth_urlencode(base_url),
            oauth_urlencode(&parameters.normalized())
        )
    }

    /// Builds the signing key: `consumer_secret&token_secret`, each part encoded.
    #[must_use]
    pub fn signing_key(&self) -> String {
        let token_secret = self.token.map_or("", |token| token.secret.as_str());
        format!(
            "{}&{}",
            oauth_urlencode(&self.consumer.secret),
            oauth_urlencode(token_secret)
        )
    }

    /// Signs a request and returns the OAuth parameters with `oauth_signature` appended.
    #[must_use]
    pub fn sign(
        &self,
        base_url: &str,
        request_params: &SignatureParameters,
        input: &SigningInput,
    ) -> Vec<(String, String)> {
        let mut oauth_params = self.oauth_parameters(input);

        let mut all_params = SignatureParameters::from_pairs(oauth_params.iter().cloned());
        all_params.extend(request_params);

        let base_string = self.base_string(base_url, &all_params);
        trace!(method = %self.method, url = base_url, base_string = %base_string, "computed OAuth1 base string");

        let signature = hmac_sha1_base64(self.signing_key().as_bytes(), base_string.as_bytes());
        oauth_params.push(("oauth_signature".to_string(), signature));
        oauth_params
    }

    /// Signs a request and renders the `Authorization` header value.
    ///
    /// The result looks like `OAuth oauth_consumer_key="...", oauth_nonce="...", ...`.
    #[must_use]
    pub fn authorization_header(
        &self,
        base_url: &str,
        request_params: &SignatureParameters,
        input: &SigningInput,
    ) -> String {
        let rendered = self
            .sign(base_url, request_params, input)
            .iter()
            .map(|(key, value)| format!("{key}=\"{}\"", oauth_urlencode(value)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {rendered}")
    }
}

/// Computes HMAC-SHA1 of `data` under `key` and base64-encodes the digest.
#[must_use]
pub fn hmac_sha1_base64(key: &[u8], data: &[u8]) -> String {
    let Ok(mut mac) = HmacSha1::new_from_slice(key) else {
        unreachable!("HMAC accepts keys of any length")
    };
    mac.update(data);
    STANDARD.encode(mac.finalize().into_bytes())
}

fn generate_nonce() -> String {
    let bytes: [u8; 16] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

fn current_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
        .to_string()
}

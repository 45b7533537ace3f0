//! OAuth token types returned by the Connect token exchanges.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::oauth::TokenCredentials;

/// Token pair returned by the pre-authorized OAuth1 exchange.
///
/// Used once, to sign the OAuth2 exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth1Token {
    /// OAuth1 token.
    pub oauth_token: String,
    /// OAuth1 token secret.
    pub oauth_token_secret: String,
    /// MFA token, present for accounts with multi-factor login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_token: Option<String>,
    /// Expiry of `mfa_token` as sent by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_expiration_timestamp: Option<String>,
}

impl OAuth1Token {
    /// Parses the form-encoded body of the pre-authorized exchange.
    ///
    /// Returns `None` when `oauth_token` or `oauth_token_secret` is missing or empty.
    #[must_use]
    pub fn from_form_body(body: &str) -> Option<Self> {
        let mut oauth_token = None;
        let mut oauth_token_secret = None;
        let mut mfa_token = None;
        let mut mfa_expiration_timestamp = None;

        for (key, value) in url::form_urlencoded::parse(body.trim().as_bytes()) {
            let value = value.into_owned();
            match key.as_ref() {
                "oauth_token" => oauth_token = Some(value),
                "oauth_token_secret" => oauth_token_secret = Some(value),
                "mfa_token" => mfa_token = Some(value),
                "mfa_expiration_timestamp" => mfa_expiration_timestamp = Some(value),
                _ => {}
            }
        }

        Some(Self {
            oauth_token: oauth_token.filter(|v| !v.is_empty())?,
            oauth_token_secret: oauth_token_secret.filter(|v| !v.is_empty())?,
            mfa_token,
            mfa_expiration_timestamp,
        })
    }
}

impl From<&OAuth1Token> for TokenCredentials {
    fn from(token: &OAuth1Token) -> Self {
        TokenCredentials::new(&token.oauth_token, &token.oauth_token_secret)
    }
}

impl fmt::Debug for OAuth1Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Token")
            .field("oauth_token", &"[REDACTED]")
            .field("oauth_token_secret", &"[REDACTED]")
            .field("mfa_token", &self.mfa_token.as_ref().map(|_| "[REDACTED]"))
            .field("mfa_expiration_timestamp", &self.mfa_expiration_timestamp)
            .finish()
    }
}

/// Bearer token returned by the OAuth2 exchange.
///
/// Metadata is kept as sent; only `access_token` is required. Fields the
/// service adds later survive a cache round trip through `extra`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuth2Token {
    /// Bearer credential for every API call.
    pub access_token: String,
    /// Usually `Bearer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Granted scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Token identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Lifetime of `access_token` in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Lifetime of `refresh_token` in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_expires_in: Option<i64>,
    /// Unix time when `access_token` expires, stamped at exchange time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Any other fields in the response.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl OAuth2Token {
    /// Creates a token with only an access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: None,
            refresh_token: None,
            scope: None,
            jti: None,
            expires_in: None,
            refresh_token_expires_in: None,
            expires_at: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Parses the JSON body of the OAuth2 exchange.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the body is not a token object.
    pub fn from_json_body(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Sets `expires_at` from `expires_in`, counted from `now` (Unix seconds).
    pub fn stamp_expiry(&mut self, now: i64) {
        if let Some(expires_in) = self.expires_in {
            self.expires_at = Some(now.saturating_add(expires_in));
        }
    }

    /// Whether `expires_at` is known and not after `now`.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// `Authorization` header value for API calls.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for OAuth2Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Token")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Current Unix time in seconds.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| i64::try_from(elapsed.as_secs()).ok())
        .unwrap_or_default()
}

//! Error types for the login flow.

use std::fmt;

use thiserror::Error;

use crate::error::ConfigurationError;
use crate::session::SessionError;
use crate::tokens::TokenStoreError;

/// Longest body excerpt kept on a failure, in characters.
pub const EXCERPT_MAX_CHARS: usize = 512;

/// Which login step rejected the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Embed bootstrap did not return 200.
    Prestart,
    /// Sign-in page did not return 200 or had no CSRF token.
    CsrfNotFound,
    /// Credential submit did not return 200.
    Signin,
    /// No ticket, and the page reports a locked account.
    AccountLocked,
    /// No ticket and no lock marker.
    BadCredentials,
    /// Pre-authorized OAuth1 exchange failed.
    OAuth1,
    /// OAuth2 exchange failed.
    OAuth2,
}

impl FailureKind {
    /// Stable kebab-case name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prestart => "prestart",
            Self::CsrfNotFound => "csrf-not-found",
            Self::Signin => "signin",
            Self::AccountLocked => "account-locked",
            Self::BadCredentials => "bad-credentials",
            Self::OAuth1 => "oauth1",
            Self::OAuth2 => "oauth2",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A login step was rejected by the service.
///
/// The whole session is unusable afterwards; clear the cookie jar before
/// trying again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("authentication failed: {kind}{}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
pub struct AuthenticationFailure {
    /// Failing step.
    pub kind: FailureKind,
    /// HTTP status of the failing response, when one was received.
    pub status: Option<u16>,
    /// Start of the response body, for diagnostics.
    pub excerpt: String,
}

impl AuthenticationFailure {
    /// Creates a failure, keeping at most [`EXCERPT_MAX_CHARS`] of `body`.
    #[must_use]
    pub fn new(kind: FailureKind, status: Option<u16>, body: &str) -> Self {
        Self {
            kind,
            status,
            excerpt: body.chars().take(EXCERPT_MAX_CHARS).collect(),
        }
    }
}

/// Errors returned by [`LoginMachine::login`](super::LoginMachine::login).
#[derive(Debug, Error)]
pub enum LoginError {
    /// Bad credentials configuration or a corrupt token cache.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The service rejected a step.
    #[error(transparent)]
    Authentication(#[from] AuthenticationFailure),

    /// Transport or cookie jar failure.
    #[error("session error during login: {0}")]
    Session(#[from] SessionError),

    /// Tokens could not be cached.
    #[error("failed to persist tokens: {0}")]
    TokenStore(#[from] TokenStoreError),
}

impl LoginError {
    /// The failure kind, for authentication failures.
    #[must_use]
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Authentication(failure) => Some(failure.kind),
            _ => None,
        }
    }
}

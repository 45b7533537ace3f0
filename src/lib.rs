//! Garmin Connect Session Library
//!
//! This library logs into Garmin Connect the way the mobile apps do: it walks
//! the single-sign-on web flow, captures the SSO ticket, exchanges it for an
//! OAuth1 token and then for an OAuth2 bearer token, and keeps a cookie-backed
//! HTTP session for the authenticated calls that follow.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`oauth`] - OAuth1 HMAC-SHA1 request signing
//! - [`session`] - Cookie-jar backed HTTP connector
//! - [`tokens`] - OAuth token model and on-disk token cache
//! - [`login`] - SSO login state machine and token exchange
//! - [`client`] - Authenticated facade used by data-endpoint callers
//! - [`error`] - Configuration errors and the crate-level error type

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod login;
pub mod oauth;
pub mod session;
pub mod tokens;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use client::{ApiError, GarminConnect};
pub use error::{ConfigurationError, Error};
pub use login::{
    AuthenticationFailure, Credentials, Endpoints, FailureKind, LoginError, LoginMachine,
    LoginOutcome, LoginState, SsoPatterns, extract_named,
};
pub use oauth::{
    OAuth1Signer, OAuthConsumer, SignatureParameters, SigningInput, TokenCredentials,
    oauth_urlencode,
};
pub use session::{
    AccountId, Connector, CookieLine, PersistentCookieJar, PostBody, RequestOptions,
    SessionConfig, SessionError,
};
pub use tokens::{CachePolicy, OAuth1Token, OAuth2Token, TokenStore, TokenStoreError};

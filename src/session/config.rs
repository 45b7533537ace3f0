//! Transport configuration for the session connector.

use std::path::PathBuf;
use std::time::Duration;

use crate::user_agent;

/// Default HTTP connect timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default total request timeout (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const COOKIE_DIR_NAME: &str = "garmin-connect";

/// Configuration for one [`Connector`](super::Connector).
///
/// TLS verification is on by default. `accept_invalid_certs` restores the
/// legacy behavior of older clients and should only be used against hosts
/// with known certificate problems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Directory holding one cookie jar file per account.
    pub cookie_dir: PathBuf,
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Total per-request timeout, body included.
    pub request_timeout: Duration,
    /// User-Agent sent unless a request overrides it.
    pub user_agent: String,
    /// When set, POST response bodies are captured to numbered files here.
    pub response_capture_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_dir: std::env::temp_dir().join(COOKIE_DIR_NAME),
            accept_invalid_certs: false,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: user_agent::default_session_user_agent(),
            response_capture_dir: None,
        }
    }
}

impl SessionConfig {
    /// Returns the config with a different cookie directory.
    #[must_use]
    pub fn with_cookie_dir(mut self, cookie_dir: impl Into<PathBuf>) -> Self {
        self.cookie_dir = cookie_dir.into();
        self
    }

    /// Returns the config with both timeouts replaced.
    #[must_use]
    pub fn with_timeouts(mut self, connect_timeout: Duration, request_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.request_timeout = request_timeout;
        self
    }

    /// Returns the config with TLS verification toggled.
    #[must_use]
    pub fn with_accept_invalid_certs(mut self, accept_invalid_certs: bool) -> Self {
        self.accept_invalid_certs = accept_invalid_certs;
        self
    }

    /// Returns the config with response capture enabled under `dir`.
    #[must_use]
    pub fn with_response_capture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.response_capture_dir = Some(dir.into());
        self
    }
}

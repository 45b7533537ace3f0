//! Configuration errors and the crate-level error type.
//!
//! Each module reports its own error enum. [`Error`] wraps them for callers
//! that drive the whole flow and want a single type to propagate.

use std::path::PathBuf;

use thiserror::Error;

use crate::client::ApiError;
use crate::login::LoginError;
use crate::session::SessionError;
use crate::tokens::TokenStoreError;

/// Errors in caller-supplied configuration or cached state.
///
/// These are fatal and never retried: fixing them needs the caller.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A required credential field is missing or blank.
    #[error("missing required credential field '{field}'")]
    MissingField {
        /// The field name.
        field: &'static str,
    },

    /// The account identifier (username) is blank.
    #[error("account identifier must not be empty")]
    InvalidIdentifier,

    /// A cached token file exists but cannot be used.
    #[error("cached token file {path} is corrupt: {source}")]
    CorruptTokenCache {
        /// The unreadable token file.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A setting has an unusable value.
    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting {
        /// The setting name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigurationError {
    /// Creates a missing-field error.
    #[must_use]
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Creates an invalid-setting error.
    pub fn invalid_setting(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            name,
            reason: reason.into(),
        }
    }
}

/// Any error this crate can return.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad configuration or cached state.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Transport or cookie jar failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Token cache failure. Corrupt token files convert to
    /// [`ConfigurationError::CorruptTokenCache`] instead.
    #[error(transparent)]
    TokenStore(TokenStoreError),

    /// Login attempt failed.
    #[error(transparent)]
    Login(#[from] LoginError),

    /// Authenticated API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

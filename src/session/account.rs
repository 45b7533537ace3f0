//! Stable per-account identifier used to name the cookie jar file.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::ConfigurationError;

const COOKIE_FILE_PREFIX: &str = "GarminCookie_";

/// Hash-derived account identifier.
///
/// The same username always maps to the same identifier, so the cookie jar
/// file name is deterministic across runs without exposing the username.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId(String);

impl AccountId {
    /// Derives the identifier from a username (lowercase hex SHA-256 of the trimmed value).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidIdentifier`] when the username is blank.
    pub fn from_username(username: &str) -> Result<Self, ConfigurationError> {
        let trimmed = username.trim();
        if trimmed.is_empty() {
            return Err(ConfigurationError::InvalidIdentifier);
        }

        let digest = Sha256::digest(trimmed.as_bytes());
        Ok(Self(hex::encode(digest)))
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the cookie jar file name for this account.
    #[must_use]
    pub fn cookie_file_name(&self) -> String {
        format!("{COOKIE_FILE_PREFIX}{}", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

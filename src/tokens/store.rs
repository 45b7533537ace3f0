//! On-disk token cache.
//!
//! Tokens are stored as JSON under a caller-supplied directory:
//! `<dir>/oauth1_token.json` and `<dir>/oauth2_token.json`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::model::{OAuth1Token, OAuth2Token};
use crate::error::ConfigurationError;

const OAUTH1_FILE_NAME: &str = "oauth1_token.json";
const OAUTH2_FILE_NAME: &str = "oauth2_token.json";

/// Errors for token cache operations.
#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    /// A token file exists but does not parse.
    #[error("corrupt token file {path}: {source}")]
    Corrupt {
        /// The unparseable file.
        path: PathBuf,
        /// The JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem I/O failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// A token could not be serialized.
    #[error("failed to serialize token: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl TokenStoreError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<TokenStoreError> for crate::Error {
    fn from(error: TokenStoreError) -> Self {
        match error {
            TokenStoreError::Corrupt { path, source } => {
                ConfigurationError::CorruptTokenCache { path, source }.into()
            }
            other => Self::TokenStore(other),
        }
    }
}

/// How much to trust a cached token pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Both token files present and parseable means logged in.
    #[default]
    TrustPresence,
    /// Like `TrustPresence`, but a cached OAuth2 token whose `expires_at`
    /// has passed forces a fresh login.
    RejectExpired,
}

impl CachePolicy {
    /// Whether a cached token may be used at `now` (Unix seconds).
    #[must_use]
    pub fn accepts(self, token: &OAuth2Token, now: i64) -> bool {
        match self {
            Self::TrustPresence => true,
            Self::RejectExpired => !token.is_expired(now),
        }
    }
}

/// Token cache rooted at one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    /// Creates a store rooted at `dir`; nothing is touched until a save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the OAuth1 token file.
    #[must_use]
    pub fn oauth1_path(&self) -> PathBuf {
        self.dir.join(OAUTH1_FILE_NAME)
    }

    /// Path of the OAuth2 token file.
    #[must_use]
    pub fn oauth2_path(&self) -> PathBuf {
        self.dir.join(OAUTH2_FILE_NAME)
    }

    /// Loads the cached OAuth1 token, `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`TokenStoreError::Corrupt`] for unparseable files and
    /// [`TokenStoreError::Io`] for read failures.
    pub fn load_oauth1(&self) -> Result<Option<OAuth1Token>, TokenStoreError> {
        read_json(&self.oauth1_path())
    }

    /// Loads the cached OAuth2 token, `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Same as [`load_oauth1`](Self::load_oauth1).
    pub fn load_oauth2(&self) -> Result<Option<OAuth2Token>, TokenStoreError> {
        read_json(&self.oauth2_path())
    }

    /// Loads both tokens, `Ok(None)` unless both files exist.
    ///
    /// # Errors
    ///
    /// Same as [`load_oauth1`](Self::load_oauth1); a corrupt file is an error
    /// even when the other one is missing.
    pub fn load_pair(&self) -> Result<Option<(OAuth1Token, OAuth2Token)>, TokenStoreError> {
        let oauth1 = self.load_oauth1()?;
        let oauth2 = self.load_oauth2()?;
        Ok(oauth1.zip(oauth2))
    }

    /// Writes the OAuth1 token, replacing any cached one.
    ///
    /// # Errors
    ///
    /// Returns [`TokenStoreError`] when the directory or file cannot be written.
    pub fn save_oauth1(&self, token: &OAuth1Token) -> Result<PathBuf, TokenStoreError> {
        self.write_json(OAUTH1_FILE_NAME, token)
    }

    /// Writes the OAuth2 token, replacing any cached one.
    ///
    /// # Errors
    ///
    /// Same as [`save_oauth1`](Self::save_oauth1).
    pub fn save_oauth2(&self, token: &OAuth2Token) -> Result<PathBuf, TokenStoreError> {
        self.write_json(OAUTH2_FILE_NAME, token)
    }

    /// Deletes both token files; returns how many existed.
    ///
    /// # Errors
    ///
    /// Returns [`TokenStoreError::Io`] when a file cannot be removed.
    pub fn clear(&self) -> Result<usize, TokenStoreError> {
        let mut removed = 0;
        for path in [self.oauth1_path(), self.oauth2_path()] {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => return Err(TokenStoreError::io(path, error)),
            }
        }
        info!(dir = %self.dir.display(), removed, "cleared token cache");
        Ok(removed)
    }

    fn write_json<T: Serialize>(&self, file_name: &str, token: &T) -> Result<PathBuf, TokenStoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| TokenStoreError::io(&self.dir, e))?;
        let path = self.dir.join(file_name);
        let json = serde_json::to_string_pretty(token).map_err(TokenStoreError::Serialize)?;
        fs::write(&path, json).map_err(|e| TokenStoreError::io(&path, e))?;
        set_owner_only_permissions(&path)?;
        debug!(path = %path.display(), "saved token");
        Ok(path)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, TokenStoreError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(TokenStoreError::io(path, error)),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| TokenStoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<(), TokenStoreError> {
    use std::os::unix::fs::PermissionsExt;

    let permissions = fs::Permissions::from_mode(0o600);
    fs::set_permissions(path, permissions).map_err(|e| TokenStoreError::io(path, e))
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<(), TokenStoreError> {
    Ok(())
}

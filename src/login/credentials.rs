//! Login credentials with a password that is wiped once used.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use zeroize::{Zeroize, Zeroizing};

use crate::error::ConfigurationError;
use crate::oauth::OAuthConsumer;

/// Account and OAuth consumer credentials for one login.
///
/// The password lives in a [`Zeroizing`] buffer. The login flow takes it out
/// for the credential submit step, after which it is dropped and wiped, so it
/// is no longer reachable through this value.
pub struct Credentials {
    username: String,
    password: Option<Zeroizing<String>>,
    consumer: OAuthConsumer,
    token_store: Option<PathBuf>,
}

impl Credentials {
    /// Creates credentials, rejecting blank fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingField`] naming the first blank field.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        let username = username.into();
        let password = Zeroizing::new(password.into());
        let consumer_key = consumer_key.into();
        let consumer_secret = Zeroizing::new(consumer_secret.into());

        require("username", &username)?;
        require("password", &password)?;
        require("consumer_key", &consumer_key)?;
        require("consumer_secret", &consumer_secret)?;

        Ok(Self {
            username: username.trim().to_string(),
            password: Some(password),
            consumer: OAuthConsumer::new(consumer_key, consumer_secret.as_str()),
            token_store: None,
        })
    }

    /// Builds credentials from a string map, consuming it.
    ///
    /// Recognized keys: `username`, `password`, `consumer_key`,
    /// `consumer_secret` and optional `token_store`. Every value is wiped
    /// before the map is dropped, including keys that are not recognized.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingField`] when a required key is
    /// absent or blank.
    pub fn from_map(mut map: HashMap<String, String>) -> Result<Self, ConfigurationError> {
        let mut take = |key: &str| map.remove(key).map(Zeroizing::new);
        let username = take("username");
        let password = take("password");
        let consumer_key = take("consumer_key");
        let consumer_secret = take("consumer_secret");
        let token_store = take("token_store");

        for value in map.values_mut() {
            value.zeroize();
        }
        drop(map);

        let field = |value: Option<Zeroizing<String>>, name: &'static str| {
            value.ok_or(ConfigurationError::missing_field(name))
        };
        let credentials = Self::new(
            field(username, "username")?.as_str(),
            field(password, "password")?.as_str(),
            field(consumer_key, "consumer_key")?.as_str(),
            field(consumer_secret, "consumer_secret")?.as_str(),
        )?;

        Ok(match token_store.filter(|dir| !dir.trim().is_empty()) {
            Some(dir) => credentials.with_token_store(dir.as_str()),
            None => credentials,
        })
    }

    /// Caches tokens under `dir`.
    #[must_use]
    pub fn with_token_store(mut self, dir: impl Into<PathBuf>) -> Self {
        self.token_store = Some(dir.into());
        self
    }

    /// The account username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The OAuth consumer used to sign the token exchanges.
    #[must_use]
    pub fn consumer(&self) -> &OAuthConsumer {
        &self.consumer
    }

    /// Token cache directory, when configured.
    #[must_use]
    pub fn token_store(&self) -> Option<&Path> {
        self.token_store.as_deref()
    }

    /// Whether the password is still held.
    #[must_use]
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Removes the password; it is wiped when the returned buffer drops.
    pub(crate) fn take_password(&mut self) -> Option<Zeroizing<String>> {
        self.password.take()
    }

    /// Wipes the password without using it.
    pub fn forget_password(&mut self) {
        self.password = None;
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("consumer", &self.consumer)
            .field("token_store", &self.token_store)
            .finish()
    }
}

fn require(name: &'static str, value: &str) -> Result<(), ConfigurationError> {
    if value.trim().is_empty() {
        Err(ConfigurationError::missing_field(name))
    } else {
        Ok(())
    }
}

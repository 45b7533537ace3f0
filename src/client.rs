//! Authenticated Garmin Connect client.
//!
//! [`GarminConnect`] owns one account's login machine and session connector
//! and attaches the OAuth2 bearer token to data-endpoint calls.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::error::Error;
use crate::login::{Credentials, EXCERPT_MAX_CHARS, Endpoints, LoginMachine, LoginOutcome};
use crate::session::{AccountId, Connector, PostBody, RequestOptions, SessionConfig};
use crate::tokens::{CachePolicy, OAuth2Token};
use crate::user_agent::CONNECT_MOBILE_USER_AGENT;

const HTTP_OK: u16 = 200;
const HTTP_NO_CONTENT: u16 = 204;

/// Errors from authenticated API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No successful login yet.
    #[error("not logged in; call login() first")]
    NotAuthenticated,

    /// The endpoint answered with a status other than the expected one.
    #[error("unexpected response code {status} from {url}")]
    UnexpectedResponseCode {
        /// The HTTP status received.
        status: u16,
        /// The endpoint URL, without query string.
        url: String,
        /// Start of the response body.
        excerpt: String,
    },

    /// The response body is not the expected JSON.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// The endpoint URL.
        url: String,
        /// The JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The request body could not be serialized.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

/// One account's authenticated session.
///
/// # Example
///
/// ```no_run
/// use garmin_connect::{Credentials, GarminConnect, SessionConfig};
///
/// # async fn example() -> Result<(), garmin_connect::Error> {
/// let credentials = Credentials::new("runner@example.com", "password", "key", "secret")?;
/// let mut client = GarminConnect::new(credentials, SessionConfig::default())?;
/// client.login().await?;
/// let profile: serde_json::Value = client
///     .get_json("/userprofile-service/socialProfile", &[])
///     .await?;
/// println!("{profile}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GarminConnect {
    machine: LoginMachine,
    connector: Connector,
    outcome: Option<LoginOutcome>,
}

impl GarminConnect {
    /// Creates the client and opens the account's cookie jar.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a blank username and
    /// [`Error::Session`] when the connector cannot be built.
    pub fn new(credentials: Credentials, config: SessionConfig) -> Result<Self, Error> {
        let account = AccountId::from_username(credentials.username())?;
        let connector = Connector::new(&account, config)?;
        Ok(Self {
            machine: LoginMachine::new(credentials),
            connector,
            outcome: None,
        })
    }

    /// Uses other endpoint locations.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.machine = self.machine.with_endpoints(endpoints);
        self
    }

    /// Sets how far cached tokens are trusted.
    #[must_use]
    pub fn with_cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.machine = self.machine.with_cache_policy(cache_policy);
        self
    }

    /// Logs in, from the token cache when possible.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Login`] when the login fails.
    pub async fn login(&mut self) -> Result<&LoginOutcome, Error> {
        let outcome = self.machine.login(&mut self.connector).await?;
        Ok(self.outcome.insert(outcome))
    }

    /// Whether a login has succeeded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.outcome.is_some()
    }

    /// The bearer token, after login.
    #[must_use]
    pub fn oauth2_token(&self) -> Option<&OAuth2Token> {
        self.outcome.as_ref().map(|outcome| &outcome.oauth2)
    }

    /// The login machine.
    #[must_use]
    pub fn machine(&self) -> &LoginMachine {
        &self.machine
    }

    /// The session connector.
    #[must_use]
    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Closes the transport and deletes the cookie jar; tokens are kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] when the jar file cannot be removed.
    pub fn cleanup(&mut self) -> Result<(), Error> {
        self.connector.cleanup_session()?;
        Ok(())
    }

    /// Forgets the session: deletes the cookie jar and the cached tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] or [`Error::TokenStore`] when a file cannot
    /// be removed.
    #[instrument(skip(self))]
    pub fn logout(&mut self) -> Result<(), Error> {
        self.outcome = None;
        self.connector.cleanup_session()?;
        if let Some(store) = self.machine.token_store() {
            store.clear()?;
        }
        info!("logged out");
        Ok(())
    }

    /// Absolute URL for an API path; absolute URLs pass through.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            self.machine.endpoints().api_url(path)
        }
    }

    /// GETs `path` with the bearer token and returns the raw body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotAuthenticated`] before login,
    /// [`ApiError::UnexpectedResponseCode`] for any status but 200, and
    /// [`Error::Session`] for transport failures.
    #[instrument(skip(self, params))]
    pub async fn get(&mut self, path: &str, params: &[(&str, &str)]) -> Result<String, Error> {
        let url = self.api_url(path);
        let options = self
            .authorized_options()?
            .params(params.iter().map(|&(k, v)| (k, v)));
        let body = self.connector.get(&url, &options).await?;
        self.expect_status(HTTP_OK, &url, &body)?;
        Ok(body)
    }

    /// GETs `path` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get), plus [`ApiError::Decode`].
    pub async fn get_json<T: DeserializeOwned>(
        &mut self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, Error> {
        let body = self.get(path, params).await?;
        decode(&self.api_url(path), &body)
    }

    /// POSTs `payload` as JSON and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Same as [`get_json`](Self::get_json), plus [`ApiError::Encode`].
    #[instrument(skip(self, payload))]
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &mut self,
        path: &str,
        payload: &B,
    ) -> Result<T, Error> {
        let url = self.api_url(path);
        let body = PostBody::Raw(serde_json::to_string(payload).map_err(ApiError::Encode)?);
        let options = self
            .authorized_options()?
            .header("Content-Type", "application/json");
        let response = self.connector.post(&url, &options, &body).await?;
        self.expect_status(HTTP_OK, &url, &response)?;
        decode(&url, &response)
    }

    /// Deletes the resource at `path`; the service answers 204 on success.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get), with 204 as the expected status.
    #[instrument(skip(self))]
    pub async fn delete(&mut self, path: &str) -> Result<(), Error> {
        let url = self.api_url(path);
        let options = self.authorized_options()?;
        let body = self.connector.delete(&url, &options).await?;
        self.expect_status(HTTP_NO_CONTENT, &url, &body)
    }

    fn authorized_options(&self) -> Result<RequestOptions, ApiError> {
        let token = self.oauth2_token().ok_or(ApiError::NotAuthenticated)?;
        Ok(RequestOptions::new()
            .header("Authorization", token.bearer_header())
            .header("User-Agent", CONNECT_MOBILE_USER_AGENT))
    }

    fn expect_status(&self, expected: u16, url: &str, body: &str) -> Result<(), Error> {
        let status = self.connector.last_response_code().unwrap_or_default();
        debug!(url, status, expected, "API response");
        if status == expected {
            Ok(())
        } else {
            Err(ApiError::UnexpectedResponseCode {
                status,
                url: url.split('?').next().unwrap_or_default().to_string(),
                excerpt: body.chars().take(EXCERPT_MAX_CHARS).collect(),
            }
            .into())
        }
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|source| {
        ApiError::Decode {
            url: url.to_string(),
            source,
        }
        .into()
    })
}

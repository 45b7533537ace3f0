//! SSO login state machine.
//!
//! Steps run strictly in order and never go back:
//!
//! 1. `CacheCheck` - use cached tokens when both files load
//! 2. `EmbedBootstrap` - GET the embed widget to seed cookies
//! 3. `SigninFetch` - GET the sign-in form and scrape its CSRF token
//! 4. `CredentialSubmit` - POST username, password and CSRF token
//! 5. `TicketExtract` - scrape the service ticket, or classify the failure
//! 6. `SessionRefresh` - new transport, same cookie jar file
//! 7. `OAuth1Exchange` - trade the ticket for an OAuth1 token
//! 8. `OAuth2Exchange` - trade the OAuth1 token for a bearer token
//! 9. `Persist` - write both tokens to the token store
//!
//! Any rejected step ends the attempt. Nothing is retried.

use std::fmt;

use tracing::{debug, info, instrument, warn};

use super::credentials::Credentials;
use super::endpoints::Endpoints;
use super::error::{AuthenticationFailure, FailureKind, LoginError};
use super::scrape::SsoPatterns;
use crate::error::ConfigurationError;
use crate::oauth::{OAuth1Signer, SignatureParameters, SigningInput, TokenCredentials};
use crate::session::{Connector, PostBody, RequestOptions};
use crate::tokens::{CachePolicy, OAuth1Token, OAuth2Token, TokenStore, TokenStoreError, unix_now};
use crate::user_agent::CONNECT_MOBILE_USER_AGENT;

const HTTP_OK: u16 = 200;

/// Position of a [`LoginMachine`] in the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoginState {
    /// Nothing has run yet.
    Idle,
    /// Looking for cached tokens.
    CacheCheck,
    /// Seeding SSO cookies.
    EmbedBootstrap,
    /// Fetching the sign-in form.
    SigninFetch,
    /// Posting credentials.
    CredentialSubmit,
    /// Scraping the service ticket.
    TicketExtract,
    /// Rebuilding the transport.
    SessionRefresh,
    /// Exchanging the ticket for an OAuth1 token.
    OAuth1Exchange,
    /// Exchanging the OAuth1 token for an OAuth2 token.
    OAuth2Exchange,
    /// Writing tokens to the cache.
    Persist,
    /// Logged in.
    Authenticated,
    /// The last attempt failed.
    Failed,
}

impl LoginState {
    /// Step name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CacheCheck => "cache-check",
            Self::EmbedBootstrap => "embed-bootstrap",
            Self::SigninFetch => "signin-fetch",
            Self::CredentialSubmit => "credential-submit",
            Self::TicketExtract => "ticket-extract",
            Self::SessionRefresh => "session-refresh",
            Self::OAuth1Exchange => "oauth1-exchange",
            Self::OAuth2Exchange => "oauth2-exchange",
            Self::Persist => "persist",
            Self::Authenticated => "authenticated",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tokens produced by a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// OAuth1 token from the pre-authorized exchange.
    pub oauth1: OAuth1Token,
    /// Bearer token for API calls.
    pub oauth2: OAuth2Token,
    /// `true` when the tokens came from the token store.
    pub from_cache: bool,
}

/// Drives one account through the SSO login and token exchanges.
///
/// The machine is single-use for network logins: the password is wiped when
/// [`login`](Self::login) returns, whatever the result. Later calls can still
/// succeed from the token cache.
#[derive(Debug)]
pub struct LoginMachine {
    credentials: Credentials,
    endpoints: Endpoints,
    patterns: SsoPatterns,
    cache_policy: CachePolicy,
    token_store: Option<TokenStore>,
    state: LoginState,
    step_statuses: Vec<(LoginState, u16)>,
}

impl LoginMachine {
    /// Creates a machine for the production endpoints.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        let token_store = credentials.token_store().map(TokenStore::new);
        Self {
            credentials,
            endpoints: Endpoints::garmin(),
            patterns: SsoPatterns::default(),
            cache_policy: CachePolicy::default(),
            token_store,
            state: LoginState::Idle,
            step_statuses: Vec::new(),
        }
    }

    /// Uses other endpoint locations.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Uses other scraping patterns.
    #[must_use]
    pub fn with_patterns(mut self, patterns: SsoPatterns) -> Self {
        self.patterns = patterns;
        self
    }

    /// Sets how far cached tokens are trusted.
    #[must_use]
    pub fn with_cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = cache_policy;
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LoginState {
        self.state
    }

    /// HTTP status observed at each network step of the last attempt.
    #[must_use]
    pub fn step_statuses(&self) -> &[(LoginState, u16)] {
        &self.step_statuses
    }

    /// Endpoints in use.
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Credentials in use (the password may already be wiped).
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Token store, when configured.
    #[must_use]
    pub fn token_store(&self) -> Option<&TokenStore> {
        self.token_store.as_ref()
    }

    /// Logs in through `connector`, or from the token cache.
    ///
    /// A network login starts by deleting the connector's cookie jar.
    ///
    /// # Errors
    ///
    /// - [`LoginError::Configuration`] for a corrupt token cache or a
    ///   password that was already used
    /// - [`LoginError::Authentication`] when the service rejects a step
    /// - [`LoginError::Session`] for transport failures
    /// - [`LoginError::TokenStore`] when tokens cannot be cached
    #[instrument(skip_all, fields(username = %self.credentials.username()))]
    pub async fn login(&mut self, connector: &mut Connector) -> Result<LoginOutcome, LoginError> {
        self.step_statuses.clear();
        let result = self.run(connector).await;
        self.credentials.forget_password();

        match &result {
            Ok(outcome) => {
                self.transition(LoginState::Authenticated);
                info!(from_cache = outcome.from_cache, "login complete");
            }
            Err(error) => {
                warn!(step = %self.state, error = %error, "login failed");
                self.transition(LoginState::Failed);
            }
        }
        result
    }

    async fn run(&mut self, connector: &mut Connector) -> Result<LoginOutcome, LoginError> {
        self.transition(LoginState::CacheCheck);
        if let Some(outcome) = self.cached_tokens()? {
            return Ok(outcome);
        }

        let password = self
            .credentials
            .take_password()
            .ok_or(ConfigurationError::missing_field("password"))?;

        connector.clear_cookie()?;
        if !connector.is_open() {
            connector.refresh_session()?;
        }

        self.transition(LoginState::EmbedBootstrap);
        let embed_options = RequestOptions::new().params(self.endpoints.embed_params());
        let body = connector
            .get(&self.endpoints.embed_url(), &embed_options)
            .await?;
        self.require_ok(connector, FailureKind::Prestart, &body)?;

        self.transition(LoginState::SigninFetch);
        let signin_url = self.endpoints.signin_url();
        let signin_params = self.endpoints.signin_params();
        let body = connector
            .get(&signin_url, &RequestOptions::new().params(signin_params.clone()))
            .await?;
        self.require_ok(connector, FailureKind::CsrfNotFound, &body)?;
        let csrf = self
            .patterns
            .csrf(&body)
            .map(str::to_string)
            .ok_or_else(|| {
                AuthenticationFailure::new(
                    FailureKind::CsrfNotFound,
                    connector.last_response_code(),
                    &body,
                )
            })?;

        self.transition(LoginState::CredentialSubmit);
        let referer = Connector::build_url(&signin_url, &signin_params)?;
        let mut form = PostBody::form([
            ("username", self.credentials.username()),
            ("password", password.as_str()),
            ("embed", "true"),
            ("_csrf", csrf.as_str()),
        ]);
        let submitted = connector
            .post(
                &signin_url,
                &RequestOptions::new()
                    .params(signin_params)
                    .referer(referer.as_str()),
                &form,
            )
            .await;
        form.zeroize_values();
        drop(password);
        let body = submitted?;
        self.require_ok(connector, FailureKind::Signin, &body)?;

        self.transition(LoginState::TicketExtract);
        let Some(ticket) = self.patterns.ticket(&body).map(str::to_string) else {
            return Err(self.reject_credentials(connector, &body).into());
        };
        debug!("service ticket captured");

        self.transition(LoginState::SessionRefresh);
        connector.refresh_session()?;

        self.transition(LoginState::OAuth1Exchange);
        let oauth1 = self.exchange_oauth1(connector, &ticket).await?;

        self.transition(LoginState::OAuth2Exchange);
        let oauth2 = self.exchange_oauth2(connector, &oauth1).await?;

        if let Some(store) = &self.token_store {
            debug!(from = %self.state, to = %LoginState::Persist, "login state transition");
            self.state = LoginState::Persist;
            store.save_oauth1(&oauth1)?;
            store.save_oauth2(&oauth2)?;
            info!(dir = %store.dir().display(), "cached OAuth tokens");
        }

        Ok(LoginOutcome {
            oauth1,
            oauth2,
            from_cache: false,
        })
    }

    fn cached_tokens(&self) -> Result<Option<LoginOutcome>, LoginError> {
        let Some(store) = &self.token_store else {
            return Ok(None);
        };

        let pair = match store.load_pair() {
            Ok(pair) => pair,
            Err(TokenStoreError::Corrupt { path, source }) => {
                return Err(ConfigurationError::CorruptTokenCache { path, source }.into());
            }
            Err(other) => return Err(other.into()),
        };

        match pair {
            Some((oauth1, oauth2)) if self.cache_policy.accepts(&oauth2, unix_now()) => {
                info!(dir = %store.dir().display(), "using cached OAuth tokens");
                Ok(Some(LoginOutcome {
                    oauth1,
                    oauth2,
                    from_cache: true,
                }))
            }
            Some(_) => {
                info!("cached OAuth2 token has expired; logging in again");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn exchange_oauth1(
        &mut self,
        connector: &mut Connector,
        ticket: &str,
    ) -> Result<OAuth1Token, LoginError> {
        let url = self.endpoints.preauthorized_url();
        let params = vec![
            ("ticket".to_string(), ticket.to_string()),
            ("login-url".to_string(), self.endpoints.embed_url()),
            ("accepts-mfa-tokens".to_string(), "true".to_string()),
        ];

        let signer = OAuth1Signer::new(self.credentials.consumer(), "GET", None);
        let authorization = signer.authorization_header(
            &url,
            &SignatureParameters::from_pairs(params.iter().cloned()),
            &SigningInput::default(),
        );

        let options = RequestOptions::new()
            .params(params)
            .header("Authorization", authorization)
            .header("User-Agent", CONNECT_MOBILE_USER_AGENT);
        let body = connector.get(&url, &options).await?;
        self.require_ok(connector, FailureKind::OAuth1, &body)?;

        OAuth1Token::from_form_body(&body).ok_or_else(|| {
            AuthenticationFailure::new(FailureKind::OAuth1, connector.last_response_code(), &body)
                .into()
        })
    }

    async fn exchange_oauth2(
        &mut self,
        connector: &mut Connector,
        oauth1: &OAuth1Token,
    ) -> Result<OAuth2Token, LoginError> {
        let url = self.endpoints.exchange_url();
        let token = TokenCredentials::from(oauth1);

        let mut fields = Vec::new();
        if let Some(mfa_token) = &oauth1.mfa_token {
            fields.push(("mfa_token".to_string(), mfa_token.clone()));
        }
        let signer = OAuth1Signer::new(self.credentials.consumer(), "POST", Some(&token));
        let authorization = signer.authorization_header(
            &url,
            &SignatureParameters::from_pairs(fields.iter().cloned()),
            &SigningInput::default(),
        );
        let body = if fields.is_empty() {
            PostBody::Empty
        } else {
            PostBody::Form(fields)
        };

        let options = RequestOptions::new()
            .header("Authorization", authorization)
            .header("User-Agent", CONNECT_MOBILE_USER_AGENT);
        let response = connector.post(&url, &options, &body).await?;
        self.require_ok(connector, FailureKind::OAuth2, &response)?;

        let mut oauth2 = OAuth2Token::from_json_body(&response).map_err(|error| {
            debug!(error = %error, "OAuth2 response is not a token");
            AuthenticationFailure::new(
                FailureKind::OAuth2,
                connector.last_response_code(),
                &response,
            )
        })?;
        oauth2.stamp_expiry(unix_now());
        Ok(oauth2)
    }

    /// Classifies a credential submit without a ticket and closes the session.
    fn reject_credentials(&self, connector: &mut Connector, body: &str) -> AuthenticationFailure {
        let kind = if self.patterns.is_locked(body) {
            FailureKind::AccountLocked
        } else {
            FailureKind::BadCredentials
        };
        warn!(
            kind = %kind,
            title = self.patterns.title(body).unwrap_or_default(),
            "no service ticket in sign-in response"
        );

        if let Err(error) = connector.cleanup_session() {
            warn!(error = %error, "failed to clean up session after rejected sign-in");
        }
        AuthenticationFailure::new(kind, connector.last_response_code(), body)
    }

    fn require_ok(
        &mut self,
        connector: &Connector,
        kind: FailureKind,
        body: &str,
    ) -> Result<(), AuthenticationFailure> {
        let status = connector.last_response_code();
        if let Some(code) = status {
            self.step_statuses.push((self.state, code));
        }
        debug!(step = %self.state, status = ?status, "login step response");

        if status == Some(HTTP_OK) {
            Ok(())
        } else {
            Err(AuthenticationFailure::new(kind, status, body))
        }
    }

    fn transition(&mut self, next: LoginState) {
        debug!(from = %self.state, to = %next, "login state transition");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{AccountId, SessionConfig};
    use tempfile::TempDir;

    fn credentials(store: Option<&std::path::Path>) -> Credentials {
        let credentials = Credentials::new("runner@example.com", "hunter2", "ck", "cs").unwrap();
        match store {
            Some(dir) => credentials.with_token_store(dir),
            None => credentials,
        }
    }

    fn connector(dir: &TempDir) -> Connector {
        let account = AccountId::from_username("runner@example.com").unwrap();
        Connector::new(&account, SessionConfig::default().with_cookie_dir(dir.path())).unwrap()
    }

    #[tokio::test]
    async fn test_cached_tokens_skip_network() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("tokens"));
        store
            .save_oauth1(&OAuth1Token::from_form_body("oauth_token=AT&oauth_token_secret=AS").unwrap())
            .unwrap();
        store.save_oauth2(&OAuth2Token::new("CACHED")).unwrap();

        // Unroutable endpoints: any network call would fail the test.
        let endpoints = Endpoints::with_hosts("http://127.0.0.1:9", "http://127.0.0.1:9").unwrap();
        let mut machine =
            LoginMachine::new(credentials(Some(store.dir()))).with_endpoints(endpoints);
        let mut connector = connector(&dir);

        let outcome = machine.login(&mut connector).await.unwrap();
        assert!(outcome.from_cache);
        assert_eq!(outcome.oauth2.access_token, "CACHED");
        assert_eq!(machine.state(), LoginState::Authenticated);
        assert_eq!(connector.last_response_code(), None);
        assert!(!machine.credentials().has_password());
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path());
        std::fs::write(store.oauth1_path(), "{").unwrap();
        std::fs::write(store.oauth2_path(), "{}").unwrap();

        let mut machine = LoginMachine::new(credentials(Some(dir.path())));
        let mut connector = connector(&dir);

        let error = machine.login(&mut connector).await.unwrap_err();
        assert!(matches!(
            error,
            LoginError::Configuration(ConfigurationError::CorruptTokenCache { .. })
        ));
        assert_eq!(machine.state(), LoginState::Failed);
    }

    #[tokio::test]
    async fn test_second_network_login_needs_new_credentials() {
        let dir = TempDir::new().unwrap();
        let mut machine = LoginMachine::new(credentials(None));
        machine.credentials.forget_password();
        let mut connector = connector(&dir);

        let error = machine.login(&mut connector).await.unwrap_err();
        assert!(matches!(
            error,
            LoginError::Configuration(ConfigurationError::MissingField { field: "password" })
        ));
    }

    #[test]
    fn test_state_names() {
        assert_eq!(LoginState::CacheCheck.to_string(), "cache-check");
        assert_eq!(LoginState::OAuth2Exchange.as_str(), "oauth2-exchange");
    }

    #[test]
    fn test_token_store_comes_from_credentials() {
        let machine = LoginMachine::new(credentials(Some(std::path::Path::new("/tmp/t"))));
        assert_eq!(
            machine.token_store().map(TokenStore::dir),
            Some(std::path::Path::new("/tmp/t"))
        );
        assert_eq!(machine.state(), LoginState::Idle);
    }
}

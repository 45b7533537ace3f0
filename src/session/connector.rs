//! Cookie-jar backed HTTP connector.
//!
//! A [`Connector`] owns one persistent cookie jar and the transport that
//! carries it. Non-2xx statuses are not errors: each call records the status
//! in [`Connector::last_response_code`] and returns the body, and the caller
//! decides what the status means.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, REFERER};
use reqwest::{Client, ClientBuilder, Method, redirect};
use tracing::{debug, instrument, warn};
use url::Url;
use zeroize::Zeroize;

use super::account::AccountId;
use super::capture::ResponseCapture;
use super::config::SessionConfig;
use super::cookie_jar::PersistentCookieJar;
use super::error::SessionError;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Per-request options shared by `get`, `post` and `delete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    /// Query parameters appended to the URL, in order.
    pub params: Vec<(String, String)>,
    /// Follow 3xx responses (default `true`).
    pub allow_redirects: bool,
    /// Value for the `Referer` header.
    pub referer: Option<String>,
    /// Extra request headers, sent in order.
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            params: Vec::new(),
            allow_redirects: true,
            referer: None,
            headers: Vec::new(),
        }
    }
}

impl RequestOptions {
    /// Creates options with redirects enabled and nothing else set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one query parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Adds several query parameters.
    #[must_use]
    pub fn params<K, V, I>(mut self, params: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Disables redirect following for this request.
    #[must_use]
    pub fn no_redirects(mut self) -> Self {
        self.allow_redirects = false;
        self
    }

    /// Sets the `Referer` header.
    #[must_use]
    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Adds one request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }
}

/// Body of a POST request.
///
/// Every variant is sent with a form `Content-Type` unless the caller passes
/// its own `Content-Type` header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PostBody {
    /// No body.
    #[default]
    Empty,
    /// Form-encoded fields.
    Form(Vec<(String, String)>),
    /// Payload sent verbatim.
    Raw(String),
}

impl PostBody {
    /// Builds a form body from key/value pairs.
    pub fn form<K, V, I>(fields: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Wipes every field value held in memory.
    pub fn zeroize_values(&mut self) {
        match self {
            Self::Empty => {}
            Self::Form(fields) => fields.iter_mut().for_each(|(_, value)| value.zeroize()),
            Self::Raw(payload) => payload.zeroize(),
        }
    }

    fn encode(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Form(fields) => url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(fields)
                .finish(),
            Self::Raw(payload) => payload.clone(),
        }
    }
}

#[derive(Debug)]
struct Transport {
    follow: Client,
    no_follow: Client,
}

impl Transport {
    fn build(config: &SessionConfig, jar: &Arc<PersistentCookieJar>) -> Result<Self, SessionError> {
        let follow = client_builder(config, jar)
            .build()
            .map_err(|source| SessionError::ClientBuild { source })?;
        let no_follow = client_builder(config, jar)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|source| SessionError::ClientBuild { source })?;
        Ok(Self { follow, no_follow })
    }

    fn client(&self, allow_redirects: bool) -> &Client {
        if allow_redirects {
            &self.follow
        } else {
            &self.no_follow
        }
    }
}

fn client_builder(config: &SessionConfig, jar: &Arc<PersistentCookieJar>) -> ClientBuilder {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .gzip(true)
        .user_agent(config.user_agent.clone())
        .cookie_provider(Arc::clone(jar))
        .danger_accept_invalid_certs(config.accept_invalid_certs)
}

/// HTTP session bound to one account's cookie jar.
///
/// # Example
///
/// ```no_run
/// use garmin_connect::session::{AccountId, Connector, RequestOptions, SessionConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let account = AccountId::from_username("runner@example.com")?;
/// let mut connector = Connector::new(&account, SessionConfig::default())?;
/// let body = connector
///     .get("https://sso.garmin.com/sso/embed", &RequestOptions::new())
///     .await?;
/// println!("{} -> {} bytes", connector.last_response_code().unwrap_or(0), body.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Connector {
    config: SessionConfig,
    jar_path: PathBuf,
    jar: Arc<PersistentCookieJar>,
    transport: Option<Transport>,
    capture: Option<ResponseCapture>,
    last_response_code: Option<u16>,
}

impl Connector {
    /// Opens the account's cookie jar and builds the transport.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] when the jar or capture directory cannot be
    /// read, or [`SessionError::ClientBuild`] when the transport cannot be built.
    #[instrument(level = "debug", skip_all, fields(account = %account))]
    pub fn new(account: &AccountId, config: SessionConfig) -> Result<Self, SessionError> {
        if config.accept_invalid_certs {
            warn!("TLS certificate verification is disabled for this session");
        }

        let jar_path = config.cookie_dir.join(account.cookie_file_name());
        let jar = Arc::new(PersistentCookieJar::open(&jar_path)?);
        let transport = Transport::build(&config, &jar)?;
        let capture = config
            .response_capture_dir
            .as_ref()
            .map(ResponseCapture::new)
            .transpose()?;

        debug!(jar = %jar_path.display(), cookies = jar.len(), "session connector ready");
        Ok(Self {
            config,
            jar_path,
            jar,
            transport: Some(transport),
            capture,
            last_response_code: None,
        })
    }

    /// Replaces the transport, keeping the same cookie jar file.
    ///
    /// Cookies are reloaded from the jar file, so a jar deleted by
    /// [`cleanup_session`](Self::cleanup_session) starts over empty.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] or [`SessionError::ClientBuild`].
    #[instrument(level = "debug", skip(self))]
    pub fn refresh_session(&mut self) -> Result<(), SessionError> {
        self.transport = None;
        self.jar = Arc::new(PersistentCookieJar::open(&self.jar_path)?);
        self.transport = Some(Transport::build(&self.config, &self.jar)?);
        debug!(cookies = self.jar.len(), "session transport refreshed");
        Ok(())
    }

    /// Issues a GET and returns the body.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] for invalid input, transport failures, or a
    /// closed session. Non-2xx statuses are not errors.
    #[instrument(skip_all, fields(url = %strip_query(url)))]
    pub async fn get(&mut self, url: &str, options: &RequestOptions) -> Result<String, SessionError> {
        let (_, body) = self.execute(Method::GET, url, options, None).await?;
        Ok(body)
    }

    /// Issues a POST and returns the body.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    #[instrument(skip_all, fields(url = %strip_query(url)))]
    pub async fn post(
        &mut self,
        url: &str,
        options: &RequestOptions,
        body: &PostBody,
    ) -> Result<String, SessionError> {
        let (final_url, text) = self.execute(Method::POST, url, options, Some(body)).await?;
        if let Some(capture) = self.capture.as_mut() {
            let status = self.last_response_code.unwrap_or_default();
            if let Err(error) = capture.record(&final_url, status, &text) {
                warn!(error = %error, "failed to capture response body");
            }
        }
        Ok(text)
    }

    /// Deletes a resource through a method-override POST.
    ///
    /// The service routes `X-HTTP-Method-Override: DELETE` on a POST, not the
    /// native verb.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    #[instrument(skip_all, fields(url = %strip_query(url)))]
    pub async fn delete(
        &mut self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<String, SessionError> {
        let options = options
            .clone()
            .header("NK", "NT")
            .header("X-HTTP-Method-Override", "DELETE");
        self.post(url, &options, &PostBody::Empty).await
    }

    /// Deletes the cookie jar file and forgets its cookies.
    ///
    /// Returns `true` when a jar file existed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] when the file cannot be removed.
    pub fn clear_cookie(&self) -> Result<bool, SessionError> {
        let removed = self.jar.delete_file()?;
        debug!(jar = %self.jar_path.display(), removed, "cleared cookie jar");
        Ok(removed)
    }

    /// Closes the transport and deletes the cookie jar.
    ///
    /// Requests fail with [`SessionError::Closed`] until
    /// [`refresh_session`](Self::refresh_session) is called.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] when the jar file cannot be removed.
    pub fn cleanup_session(&mut self) -> Result<(), SessionError> {
        self.transport = None;
        self.clear_cookie()?;
        Ok(())
    }

    /// Most recent HTTP status, `None` before the first response.
    #[must_use]
    pub fn last_response_code(&self) -> Option<u16> {
        self.last_response_code
    }

    /// Path of the cookie jar file.
    #[must_use]
    pub fn jar_path(&self) -> &Path {
        &self.jar_path
    }

    /// The live cookie jar.
    #[must_use]
    pub fn cookie_jar(&self) -> &PersistentCookieJar {
        &self.jar
    }

    /// Whether the transport is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Appends `params` to `url` as a query string.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidUrl`] when `url` does not parse.
    pub fn build_url(url: &str, params: &[(String, String)]) -> Result<Url, SessionError> {
        let mut parsed = Url::parse(url).map_err(|_| SessionError::invalid_url(url))?;
        if !params.is_empty() {
            parsed.query_pairs_mut().extend_pairs(params);
        }
        Ok(parsed)
    }

    async fn execute(
        &mut self,
        method: Method,
        url: &str,
        options: &RequestOptions,
        body: Option<&PostBody>,
    ) -> Result<(String, String), SessionError> {
        let transport = self.transport.as_ref().ok_or(SessionError::Closed)?;
        let target = Self::build_url(url, &options.params)?;
        let mut headers = request_headers(options)?;

        let mut request = transport
            .client(options.allow_redirects)
            .request(method.clone(), target.clone());
        if let Some(body) = body {
            if !options.has_header(CONTENT_TYPE.as_str()) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
            }
            request = request.body(body.encode());
        }

        let logged = strip_query(target.as_str());
        let response = request
            .headers(headers)
            .send()
            .await
            .map_err(|e| SessionError::from_transport(logged.clone(), e))?;

        let status = response.status().as_u16();
        self.last_response_code = Some(status);
        let final_url = strip_query(response.url().as_str());

        let text = response
            .text()
            .await
            .map_err(|e| SessionError::from_transport(logged.clone(), e))?;
        debug!(method = %method, url = %logged, status, bytes = text.len(), "response received");
        Ok((final_url, text))
    }
}

fn request_headers(options: &RequestOptions) -> Result<HeaderMap, SessionError> {
    let mut headers = HeaderMap::new();
    if let Some(referer) = &options.referer {
        let value = HeaderValue::from_str(referer).map_err(|_| SessionError::InvalidHeader {
            name: REFERER.to_string(),
        })?;
        headers.insert(REFERER, value);
    }
    for (name, value) in &options.headers {
        let invalid = || SessionError::InvalidHeader { name: name.clone() };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

/// Drops the query string so tickets and tokens never reach the logs.
fn strip_query(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}

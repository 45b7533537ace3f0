//! Mock SSO and OAuth service used by the login tests.

use std::path::Path;

use garmin_connect::{AccountId, Connector, Credentials, Endpoints, SessionConfig};
use wiremock::matchers::{body_string_contains, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USERNAME: &str = "runner@example.com";
pub const PASSWORD: &str = "correct-horse-battery";
pub const CONSUMER_KEY: &str = "consumer-key";
pub const CONSUMER_SECRET: &str = "consumer-secret";
pub const CSRF: &str = "csrf-7f3a";
pub const TICKET: &str = "ST-0042-abc";
pub const OAUTH1_TOKEN: &str = "oauth1-token";
pub const OAUTH1_SECRET: &str = "oauth1-secret";
pub const BEARER: &str = "BEARER1";
pub const SSO_COOKIE: &str = "GARMIN-SSO=1";
pub const MOBILE_USER_AGENT: &str = "com.garmin.android.apps.connectmobile";

pub const EMBED_PATH: &str = "/sso/embed";
pub const SIGNIN_PATH: &str = "/sso/signin";
pub const PREAUTHORIZED_PATH: &str = "/oauth-service/oauth/preauthorized";
pub const EXCHANGE_PATH: &str = "/oauth-service/oauth/exchange/user/2.0";

#[must_use]
pub fn signin_page() -> String {
    format!(
        r#"<html><head><title>GARMIN Authentication Application</title></head>
<body><form method="post" id="login-form">
<input type="hidden" name="_csrf" value="{CSRF}" />
</form></body></html>"#
    )
}

#[must_use]
pub fn ticket_page() -> String {
    format!(
        r#"<html><head><title>Success</title></head><body><script>
var response_url = "https:\/\/sso.garmin.com\/sso\/embed?ticket={TICKET}";
</script></body></html>"#
    )
}

#[must_use]
pub fn locked_page() -> String {
    r#"<html><head><title>Account Locked</title></head>
<body><div class="error">ACCOUNT_LOCKED</div></body></html>"#
        .to_string()
}

#[must_use]
pub fn bad_credentials_page() -> String {
    r#"<html><head><title>GARMIN Authentication Application</title></head>
<body><div class="error">Invalid sign in. (Passwords are case sensitive.)</div></body></html>"#
        .to_string()
}

#[must_use]
pub fn oauth1_body() -> String {
    format!("oauth_token={OAUTH1_TOKEN}&oauth_token_secret={OAUTH1_SECRET}")
}

#[must_use]
pub fn oauth2_body() -> serde_json::Value {
    serde_json::json!({
        "scope": "CONNECT_READ CONNECT_WRITE",
        "jti": "jti-1",
        "access_token": BEARER,
        "token_type": "Bearer",
        "refresh_token": "refresh-1",
        "expires_in": 3600,
        "refresh_token_expires_in": 7200
    })
}

#[must_use]
pub fn endpoints(server: &MockServer) -> Endpoints {
    Endpoints::with_hosts(&server.uri(), &server.uri()).expect("mock origin is valid")
}

#[must_use]
pub fn credentials() -> Credentials {
    Credentials::new(USERNAME, PASSWORD, CONSUMER_KEY, CONSUMER_SECRET)
        .expect("test credentials are valid")
}

#[must_use]
pub fn connector(cookie_dir: &Path) -> Connector {
    let account = AccountId::from_username(USERNAME).expect("username is valid");
    Connector::new(&account, SessionConfig::default().with_cookie_dir(cookie_dir))
        .expect("connector builds")
}

pub async fn mount_embed(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path(EMBED_PATH))
        .and(query_param("id", "gauth-widget"))
        .and(query_param("embedWidget", "true"))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("set-cookie", format!("{SSO_COOKIE}; Path=/").as_str())
                .set_body_string("<html><body>embed</body></html>"),
        )
        .mount(server)
        .await;
}

/// Serves the sign-in form only to clients carrying the embed cookie.
pub async fn mount_signin_page(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path(SIGNIN_PATH))
        .and(header("cookie", SSO_COOKIE))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

pub async fn mount_credential_submit(server: &MockServer, status: u16, body: String) {
    Mock::given(method("POST"))
        .and(path(SIGNIN_PATH))
        .and(body_string_contains(format!("_csrf={CSRF}")))
        .and(body_string_contains("embed=true"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

pub async fn mount_preauthorized(server: &MockServer, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(PREAUTHORIZED_PATH))
        .and(query_param("ticket", TICKET))
        .and(query_param("accepts-mfa-tokens", "true"))
        .and(header_exists("authorization"))
        .and(header("user-agent", MOBILE_USER_AGENT))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

pub async fn mount_exchange(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(EXCHANGE_PATH))
        .and(header_exists("authorization"))
        .and(header("user-agent", MOBILE_USER_AGENT))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mounts every step of a successful login.
pub async fn mount_happy_path(server: &MockServer) {
    mount_embed(server, 200).await;
    mount_signin_page(server, signin_page()).await;
    mount_credential_submit(server, 200, ticket_page()).await;
    mount_preauthorized(server, 200, oauth1_body()).await;
    mount_exchange(
        server,
        ResponseTemplate::new(200).set_body_json(oauth2_body()),
    )
    .await;
}

/// Requests received so far whose path is `request_path`.
pub async fn requests_to(server: &MockServer, request_path: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == request_path)
        .collect()
}

#[must_use]
pub fn header_value(request: &wiremock::Request, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

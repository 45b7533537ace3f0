//! Passwords, token secrets, tickets and cookie values must not reach error
//! messages or Debug output.

use std::io::Cursor;

use garmin_connect::session::parse_netscape_cookies;
use garmin_connect::{
    AccountId, Connector, Credentials, OAuth1Token, OAuth2Token, RequestOptions, SessionConfig,
    TokenStore,
};
use tempfile::TempDir;

use crate::support::socket_guard::{should_skip_socket_bound_test, socket_skip_return};
use crate::support::sso;

const PASSWORD: &str = "pw-very-secret-9931";
const CONSUMER_SECRET: &str = "consumer-secret-4471";

#[test]
fn p0_credentials_debug_hides_secrets() {
    let credentials =
        Credentials::new("runner@example.com", PASSWORD, "ck", CONSUMER_SECRET).expect("valid");

    let rendered = format!("{credentials:?}");
    assert!(!rendered.contains(PASSWORD), "{rendered}");
    assert!(!rendered.contains(CONSUMER_SECRET), "{rendered}");
    assert!(rendered.contains("runner@example.com"));
}

#[test]
fn p0_token_debug_hides_secrets() {
    let oauth1 = OAuth1Token::from_form_body(
        "oauth_token=tok-5521&oauth_token_secret=sec-8812&mfa_token=mfa-7710",
    )
    .expect("valid body");
    let mut oauth2 = OAuth2Token::new("access-3390");
    oauth2.refresh_token = Some("refresh-1184".to_string());

    let rendered = format!("{oauth1:?} {oauth2:?}");
    for secret in ["tok-5521", "sec-8812", "mfa-7710", "access-3390", "refresh-1184"] {
        assert!(!rendered.contains(secret), "{secret} leaked: {rendered}");
    }
}

#[test]
fn p0_missing_field_error_does_not_echo_values() {
    let error = Credentials::new("runner@example.com", PASSWORD, "ck", "  ").unwrap_err();

    let message = error.to_string();
    assert!(message.contains("consumer_secret"), "{message}");
    assert!(!message.contains(PASSWORD), "{message}");
}

#[test]
fn p0_corrupt_token_cache_error_does_not_echo_contents() {
    let temp_dir = TempDir::new().expect("temp dir");
    let store = TokenStore::new(temp_dir.path());
    std::fs::write(store.oauth2_path(), r#"{"access_token": "access-6620""#).expect("write");

    let error = store.load_oauth2().unwrap_err();
    let message = format!("{error} {error:?}");
    assert!(!message.contains("access-6620"), "{message}");
}

#[test]
fn p0_malformed_cookie_line_warning_redacts_value() {
    let input = "example.com\tFALSE\t/\tFALSE\tnot-a-number\tSESSION\tcookie-4402\n\
                 example.com\tFALSE\t/\tFALSE\t0\tOK\tfine\n";

    let result = parse_netscape_cookies(Cursor::new(input.as_bytes())).expect("partial parse");
    assert_eq!(result.cookies.len(), 1);
    assert_eq!(result.warnings.len(), 1);
    assert!(!result.warnings[0].1.contains("cookie-4402"));
    assert!(result.warnings[0].1.contains("[REDACTED]"));

    let rendered = format!("{:?}", result.cookies);
    assert!(!rendered.contains("fine"), "{rendered}");
}

#[tokio::test]
async fn p0_network_error_does_not_contain_query_string() {
    if should_skip_socket_bound_test() {
        return socket_skip_return();
    }
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let origin = format!("http://{}", listener.local_addr().expect("addr"));
    drop(listener);

    let temp_dir = TempDir::new().expect("temp dir");
    let account = AccountId::from_username("runner@example.com").expect("account");
    let mut connector = Connector::new(
        &account,
        SessionConfig::default().with_cookie_dir(temp_dir.path()),
    )
    .expect("connector");

    let error = connector
        .get(
            &format!("{origin}/oauth-service/oauth/preauthorized"),
            &RequestOptions::new().param("ticket", "ST-ticket-7781"),
        )
        .await
        .unwrap_err();
    let message = error.to_string();
    assert!(!message.contains("ST-ticket-7781"), "{message}");
}

#[tokio::test]
async fn p0_rejected_login_error_does_not_contain_password() {
    let Some(server) = crate::support::socket_guard::start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    sso::mount_embed(&server, 200).await;
    sso::mount_signin_page(&server, sso::signin_page()).await;
    sso::mount_credential_submit(&server, 200, sso::bad_credentials_page()).await;
    let temp_dir = TempDir::new().expect("temp dir");
    let mut connector = sso::connector(temp_dir.path());
    let mut machine =
        garmin_connect::LoginMachine::new(sso::credentials()).with_endpoints(sso::endpoints(&server));

    let error = machine.login(&mut connector).await.unwrap_err();

    let message = format!("{error} {error:?} {machine:?}");
    assert!(!message.contains(sso::PASSWORD), "{message}");
    assert!(!machine.credentials().has_password());
}

//! Dropped connections and server errors surface as typed failures and leave
//! the login machine in its failed state.

use std::time::Duration;

use garmin_connect::{
    AccountId, Connector, Endpoints, FailureKind, LoginError, LoginMachine, LoginState,
    SessionConfig, SessionError,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::support::socket_guard::{socket_skip_return, start_mock_server_or_skip};
use crate::support::sso;

#[tokio::test]
async fn p0_timeout_during_signin_is_session_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    sso::mount_embed(&server, 200).await;
    Mock::given(method("GET"))
        .and(path(sso::SIGNIN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(sso::signin_page())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("temp dir");
    let account = AccountId::from_username(sso::USERNAME).expect("account");
    let config = SessionConfig::default()
        .with_cookie_dir(temp_dir.path())
        .with_timeouts(Duration::from_secs(1), Duration::from_millis(300));
    let mut connector = Connector::new(&account, config).expect("connector");
    let mut machine = LoginMachine::new(sso::credentials()).with_endpoints(sso::endpoints(&server));

    let error = machine.login(&mut connector).await.unwrap_err();
    assert!(
        matches!(error, LoginError::Session(SessionError::Timeout { .. })),
        "{error:?}"
    );
    assert_eq!(machine.state(), LoginState::Failed);
    assert_eq!(machine.step_statuses(), &[(LoginState::EmbedBootstrap, 200)]);
}

#[tokio::test]
async fn p0_server_error_on_exchange_is_not_retried() {
    let Some(server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    sso::mount_embed(&server, 200).await;
    sso::mount_signin_page(&server, sso::signin_page()).await;
    sso::mount_credential_submit(&server, 200, sso::ticket_page()).await;
    sso::mount_preauthorized(&server, 200, sso::oauth1_body()).await;
    Mock::given(method("POST"))
        .and(path(sso::EXCHANGE_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("temp dir");
    let mut connector = sso::connector(temp_dir.path());
    let mut machine = LoginMachine::new(sso::credentials()).with_endpoints(sso::endpoints(&server));

    let error = machine.login(&mut connector).await.unwrap_err();
    assert_eq!(error.kind(), Some(FailureKind::OAuth2));
    assert_eq!(connector.last_response_code(), Some(502));
}

#[tokio::test]
async fn p0_unresolvable_host_is_session_error() {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut connector = sso::connector(temp_dir.path());
    let endpoints = Endpoints::with_hosts(
        "http://garmin-sso.invalid",
        "http://garmin-api.invalid",
    )
    .expect("endpoints");
    let mut machine = LoginMachine::new(sso::credentials()).with_endpoints(endpoints);

    let error = machine.login(&mut connector).await.unwrap_err();
    assert!(matches!(error, LoginError::Session(_)), "{error:?}");
    assert_eq!(error.kind(), None);
    assert_eq!(connector.last_response_code(), None);
}

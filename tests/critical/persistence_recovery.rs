//! On-disk state survives reopen, and damaged files are handled without
//! losing the ability to log in again.

use garmin_connect::{
    AccountId, ConfigurationError, Connector, Credentials, Error, GarminConnect, OAuth1Token,
    OAuth2Token, PersistentCookieJar, SessionConfig, TokenStore,
};
use tempfile::TempDir;
use url::Url;

#[test]
fn p0_cookie_jar_persists_after_reopen() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("GarminCookie_test");
    {
        let jar = PersistentCookieJar::open(&path).expect("open");
        let origin = Url::parse("https://sso.garmin.com/sso/embed").expect("url");
        jar.add_cookie_str("GARMIN-SSO=1; Domain=.garmin.com; Path=/", &origin)
            .expect("add");
        jar.add_cookie_str("CASTGC=TGT-1; Path=/sso", &origin)
            .expect("add");
    }

    let reopened = PersistentCookieJar::open(&path).expect("reopen");
    let mut names: Vec<String> = reopened.snapshot().into_iter().map(|c| c.name).collect();
    names.sort();
    assert_eq!(names, vec!["CASTGC".to_string(), "GARMIN-SSO".to_string()]);
}

#[test]
fn p0_garbage_cookie_jar_starts_empty() {
    let temp_dir = TempDir::new().expect("temp dir");
    let account = AccountId::from_username("runner@example.com").expect("account");
    let path = temp_dir.path().join(account.cookie_file_name());
    std::fs::write(&path, "this is not a cookie file\n").expect("write");

    let connector = Connector::new(
        &account,
        SessionConfig::default().with_cookie_dir(temp_dir.path()),
    )
    .expect("connector opens despite garbage jar");
    assert!(connector.cookie_jar().is_empty());
}

#[test]
fn p0_token_cache_persists_after_reopen() {
    let temp_dir = TempDir::new().expect("temp dir");
    let oauth1 = OAuth1Token::from_form_body("oauth_token=T&oauth_token_secret=S").expect("token");
    let mut oauth2 = OAuth2Token::new("BEARER");
    oauth2.expires_in = Some(3600);
    oauth2.stamp_expiry(1_700_000_000);
    {
        let store = TokenStore::new(temp_dir.path().join("tokens"));
        store.save_oauth1(&oauth1).expect("save");
        store.save_oauth2(&oauth2).expect("save");
    }

    let store = TokenStore::new(temp_dir.path().join("tokens"));
    let (loaded1, loaded2) = store.load_pair().expect("load").expect("both present");
    assert_eq!(loaded1, oauth1);
    assert_eq!(loaded2, oauth2);
    assert_eq!(loaded2.expires_at, Some(1_700_003_600));
}

#[tokio::test]
async fn p0_corrupt_token_cache_is_reported_and_cleared_by_logout() {
    let temp_dir = TempDir::new().expect("temp dir");
    let store_dir = temp_dir.path().join("tokens");
    std::fs::create_dir_all(&store_dir).expect("mkdir");
    let store = TokenStore::new(&store_dir);
    std::fs::write(store.oauth1_path(), "not json").expect("write");
    std::fs::write(store.oauth2_path(), "{}").expect("write");

    let credentials = Credentials::new("runner@example.com", "pw", "ck", "cs")
        .expect("credentials")
        .with_token_store(&store_dir);
    let mut client = GarminConnect::new(
        credentials,
        SessionConfig::default().with_cookie_dir(temp_dir.path()),
    )
    .expect("client");

    let error = client.login().await.unwrap_err();
    assert!(
        matches!(
            &error,
            Error::Login(garmin_connect::LoginError::Configuration(
                ConfigurationError::CorruptTokenCache { .. }
            ))
        ),
        "{error:?}"
    );

    client.logout().expect("logout");
    assert!(!store.oauth1_path().exists());
    assert!(!store.oauth2_path().exists());
}

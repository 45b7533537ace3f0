//! Cookies set for foreign domains, unsafe paths or already expired must not
//! be stored or replayed.

use garmin_connect::PersistentCookieJar;
use reqwest::cookie::CookieStore;
use tempfile::TempDir;
use url::Url;

fn jar(temp_dir: &TempDir) -> PersistentCookieJar {
    PersistentCookieJar::open(temp_dir.path().join("jar")).expect("open jar")
}

#[test]
fn p0_cookie_for_parent_of_other_domain_is_rejected() {
    let temp_dir = TempDir::new().expect("temp dir");
    let jar = jar(&temp_dir);
    let origin = Url::parse("https://sso.garmin.com/sso/signin").expect("url");

    jar.add_cookie_str("sid=evil; Domain=evil.com; Path=/", &origin)
        .expect("add");
    jar.add_cookie_str("sid=evil; Domain=ngarmin.com; Path=/", &origin)
        .expect("add");

    assert!(jar.is_empty());
    assert!(!jar.path().exists(), "nothing stored, nothing written");
}

#[test]
fn p0_domain_cookie_is_replayed_to_sibling_subdomain_only() {
    let temp_dir = TempDir::new().expect("temp dir");
    let jar = jar(&temp_dir);
    let origin = Url::parse("https://sso.garmin.com/sso/signin").expect("url");
    jar.add_cookie_str("GARMIN-SSO=1; Domain=.garmin.com; Path=/", &origin)
        .expect("add");

    let api = Url::parse("https://connectapi.garmin.com/x").expect("url");
    let other = Url::parse("https://garmin.com.evil.net/x").expect("url");
    assert_eq!(
        jar.cookies(&api).and_then(|v| v.to_str().ok().map(str::to_string)),
        Some("GARMIN-SSO=1".to_string())
    );
    assert!(jar.cookies(&other).is_none());
}

#[test]
fn p0_secure_cookie_is_not_sent_over_http() {
    let temp_dir = TempDir::new().expect("temp dir");
    let jar = jar(&temp_dir);
    let origin = Url::parse("https://sso.garmin.com/").expect("url");
    jar.add_cookie_str("SESSION=s1; Path=/; Secure", &origin)
        .expect("add");

    assert!(jar.cookies(&Url::parse("http://sso.garmin.com/").expect("url")).is_none());
    assert!(jar.cookies(&origin).is_some());
}

#[test]
fn p0_expired_cookie_replaces_and_removes_existing() {
    let temp_dir = TempDir::new().expect("temp dir");
    let jar = jar(&temp_dir);
    let origin = Url::parse("https://sso.garmin.com/").expect("url");
    jar.add_cookie_str("SESSION=s1; Path=/", &origin).expect("add");
    assert_eq!(jar.len(), 1);

    jar.add_cookie_str("SESSION=gone; Path=/; Max-Age=0", &origin)
        .expect("add");
    assert!(jar.is_empty());

    let reopened = PersistentCookieJar::open(jar.path()).expect("reopen");
    assert!(reopened.is_empty());
}

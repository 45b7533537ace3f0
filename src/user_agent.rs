//! Shared User-Agent strings for SSO and API traffic.
//!
//! The SSO pages expect a desktop browser; the OAuth exchange and data
//! endpoints expect the Connect mobile app.

/// Browser User-Agent sent while scraping the SSO pages.
pub(crate) const SSO_BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64; \
    rv:128.0) Gecko/20100101 Firefox/128.0";

/// Mobile-app User-Agent expected by the OAuth service and `connectapi` endpoints.
pub(crate) const CONNECT_MOBILE_USER_AGENT: &str = "com.garmin.android.apps.connectmobile";

/// Default User-Agent for a freshly built session transport.
#[must_use]
pub(crate) fn default_session_user_agent() -> String {
    SSO_BROWSER_USER_AGENT.to_string()
}

//! Pattern-based extraction from SSO pages.
//!
//! [`extract_named`] is the only scraping primitive; [`SsoPatterns`] groups
//! the expressions the login flow needs so they can be replaced without
//! touching the flow itself.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

/// Hidden `_csrf` input on the sign-in form.
#[allow(clippy::expect_used)]
static CSRF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name="_csrf"\s+value="(?P<csrf>[^"]+)""#).expect("CSRF regex is valid") // Static pattern, safe to panic
});

/// Service ticket in the post-login redirect script.
#[allow(clippy::expect_used)]
static TICKET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"ticket=(?P<ticket>[^"&'\s<>]+)"#).expect("ticket regex is valid") // Static pattern, safe to panic
});

/// Page title, used for failure diagnostics.
#[allow(clippy::expect_used)]
static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title>\s*(?P<title>.+?)\s*</title>").expect("title regex is valid") // Static pattern, safe to panic
});

/// Lockout marker on the sign-in response.
#[allow(clippy::expect_used)]
static LOCK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ACCOUNT_LOCKED|temporarily\s+locked|account\s+(?:has\s+been\s+|is\s+)?locked")
        .expect("lock marker regex is valid") // Static pattern, safe to panic
});

/// Returns the text captured by group `group` on the first match of `pattern`.
///
/// Returns `None` when nothing matches or the group did not participate.
#[must_use]
pub fn extract_named<'a>(body: &'a str, pattern: &Regex, group: &str) -> Option<&'a str> {
    let value = pattern
        .captures(body)
        .and_then(|captures| captures.name(group))
        .map(|m| m.as_str());
    trace!(group, found = value.is_some(), "pattern extraction");
    value
}

/// Expressions used to scrape the SSO pages.
///
/// `csrf`, `ticket` and `title` must define a capture group of the same name.
#[derive(Debug, Clone)]
pub struct SsoPatterns {
    /// Finds the `csrf` group.
    pub csrf: Regex,
    /// Finds the `ticket` group.
    pub ticket: Regex,
    /// Finds the `title` group.
    pub title: Regex,
    /// Matches when the account is locked.
    pub lock_marker: Regex,
}

impl Default for SsoPatterns {
    fn default() -> Self {
        Self {
            csrf: CSRF_PATTERN.clone(),
            ticket: TICKET_PATTERN.clone(),
            title: TITLE_PATTERN.clone(),
            lock_marker: LOCK_PATTERN.clone(),
        }
    }
}

impl SsoPatterns {
    /// CSRF token from the sign-in form.
    #[must_use]
    pub fn csrf<'a>(&self, body: &'a str) -> Option<&'a str> {
        extract_named(body, &self.csrf, "csrf")
    }

    /// Service ticket from the credential submit response.
    #[must_use]
    pub fn ticket<'a>(&self, body: &'a str) -> Option<&'a str> {
        extract_named(body, &self.ticket, "ticket")
    }

    /// Page title.
    #[must_use]
    pub fn title<'a>(&self, body: &'a str) -> Option<&'a str> {
        extract_named(body, &self.title, "title")
    }

    /// Whether the body reports a locked account.
    #[must_use]
    pub fn is_locked(&self, body: &str) -> bool {
        self.lock_marker.is_match(body)
    }
}

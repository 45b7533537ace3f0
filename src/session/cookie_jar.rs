//! Persistent cookie jar backed by a Netscape-format cookie file.
//!
//! The jar implements [`reqwest::cookie::CookieStore`], so the transport stores
//! every `Set-Cookie` it sees and attaches matching cookies to each request.
//! After every change the whole jar is rewritten to its file (7 TAB-separated
//! fields per line, the same format curl and browser extensions use).

use std::fmt;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use cookie::Cookie;
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use tracing::{debug, instrument, warn};
use url::Url;

use super::error::SessionError;

const NETSCAPE_HEADER: &str = "# Netscape HTTP Cookie File";
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";
// Expiry used for cookies deleted through `Max-Age<=0`.
const EXPIRED: u64 = 1;

/// A single cookie as stored in a Netscape-format cookie file.
///
/// The value field is intentionally redacted in Debug output to prevent
/// accidental logging of session cookies.
#[derive(Clone, PartialEq, Eq)]
pub struct CookieLine {
    /// The domain the cookie belongs to (`.example.com` for domain cookies).
    pub domain: String,
    /// Whether subdomains should match.
    pub tailmatch: bool,
    /// The URL path scope for the cookie.
    pub path: String,
    /// Whether the cookie should only be sent over HTTPS.
    pub secure: bool,
    /// Unix timestamp for expiry (0 = session cookie).
    pub expires: u64,
    /// Cookie name.
    pub name: String,
    /// Whether the cookie is hidden from scripts (`#HttpOnly_` in the file).
    pub http_only: bool,
    /// Cookie value (sensitive, never log).
    value: String,
}

impl CookieLine {
    /// Creates a new cookie entry.
    #[must_use]
    pub fn new(
        domain: String,
        tailmatch: bool,
        path: String,
        secure: bool,
        expires: u64,
        name: String,
        value: String,
    ) -> Self {
        Self {
            domain,
            tailmatch,
            path,
            secure,
            expires,
            name,
            http_only: false,
            value,
        }
    }

    /// Sets the HttpOnly flag.
    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive; avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    fn is_expired(&self, now: u64) -> bool {
        self.expires != 0 && self.expires <= now
    }

    fn same_slot(&self, other: &CookieLine) -> bool {
        self.name == other.name
            && self.path == other.path
            && self.domain.eq_ignore_ascii_case(&other.domain)
    }

    fn matches(&self, url: &Url, now: u64) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let domain = self.domain.trim_start_matches('.').to_ascii_lowercase();

        let host_matches = if self.tailmatch {
            domain_matches(&host, &domain)
        } else {
            host == domain
        };

        host_matches
            && path_matches(url.path(), &self.path)
            && (!self.secure || url.scheme() == "https")
            && !self.is_expired(now)
    }
}

// Custom Debug impl that redacts the cookie value.
impl fmt::Debug for CookieLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieLine")
            .field("domain", &self.domain)
            .field("tailmatch", &self.tailmatch)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("expires", &self.expires)
            .field("name", &self.name)
            .field("http_only", &self.http_only)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Errors that can occur while parsing a cookie file.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    /// A line in the cookie file has an invalid format.
    #[error("line {line_number}: {reason} (got: {content})")]
    InvalidLine {
        /// 1-based line number in the cookie file.
        line_number: usize,
        /// The offending line content (with value redacted).
        content: String,
        /// Description of what was wrong.
        reason: String,
    },

    /// I/O error reading the cookie file.
    #[error("failed to read cookie file: {0}")]
    Io(#[from] std::io::Error),

    /// No valid cookies found in a non-empty file.
    #[error("no valid cookies found in file ({malformed_count} lines failed to parse)")]
    NoCookiesFound {
        /// Number of malformed lines encountered.
        malformed_count: usize,
    },
}

/// Result of parsing a cookie file, including successfully parsed cookies
/// and any warnings about malformed lines.
#[derive(Debug)]
pub struct ParseResult {
    /// Successfully parsed cookies.
    pub cookies: Vec<CookieLine>,
    /// Warnings for malformed lines (line number and reason).
    pub warnings: Vec<(usize, String)>,
}

/// Parses a Netscape-format cookie file from a buffered reader.
///
/// Each data line must contain exactly 7 TAB-separated fields:
/// `domain`, `tailmatch`, `path`, `secure`, `expires`, `name`, `value`.
/// Lines prefixed with `#HttpOnly_` are data lines; other `#` lines and blank
/// lines are skipped.
///
/// # Errors
///
/// Returns [`CookieError::Io`] on read failure, or
/// [`CookieError::NoCookiesFound`] when a non-empty file yields zero valid cookies.
/// Individual malformed lines are collected as warnings (partial success).
#[instrument(level = "debug", skip(reader))]
pub fn parse_netscape_cookies(reader: impl BufRead) -> Result<ParseResult, CookieError> {
    let mut cookies = Vec::new();
    let mut warnings = Vec::new();
    let mut data_lines = 0;

    for (idx, line_result) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line_result?;
        // Handle CRLF: strip trailing \r
        let line = line.trim_end_matches(['\r', '\n']);

        if line.trim().is_empty() {
            continue;
        }

        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None if line.starts_with('#') => continue,
            None => (line, false),
        };

        data_lines += 1;

        match parse_cookie_line(line, line_number) {
            Ok(cookie) => cookies.push(cookie.with_http_only(http_only)),
            Err(e) => {
                warn!(line = line_number, reason = %e, "skipping malformed cookie line");
                warnings.push((line_number, e.to_string()));
            }
        }
    }

    if cookies.is_empty() && data_lines > 0 {
        return Err(CookieError::NoCookiesFound {
            malformed_count: warnings.len(),
        });
    }

    Ok(ParseResult { cookies, warnings })
}

/// Writes cookies in Netscape format, header included.
///
/// # Errors
///
/// Returns any error raised by the underlying writer.
pub fn write_netscape_cookies(cookies: &[CookieLine], mut writer: impl Write) -> io::Result<()> {
    writeln!(writer, "{NETSCAPE_HEADER}")?;
    writeln!(writer, "# Written by garmin-connect. Edit at your own risk.")?;
    writeln!(writer)?;
    for cookie in cookies {
        let prefix = if cookie.http_only { HTTP_ONLY_PREFIX } else { "" };
        writeln!(
            writer,
            "{prefix}{}\t{}\t{}\t{}\t{}\t{}\t{}",
            cookie.domain,
            bool_field(cookie.tailmatch),
            cookie.path,
            bool_field(cookie.secure),
            cookie.expires,
            cookie.name,
            cookie.value()
        )?;
    }
    Ok(())
}

fn bool_field(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

/// Parses a single cookie line into a `CookieLine`.
fn parse_cookie_line(line: &str, line_number: usize) -> Result<CookieLine, CookieError> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() != 7 {
        return Err(CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: format!("expected 7 TAB-separated fields, found {}", fields.len()),
        });
    }

    let domain = fields[0].to_string();
    let tailmatch = parse_bool_field(fields[1], "tailmatch", line_number, line)?;
    let path = fields[2].to_string();
    let secure = parse_bool_field(fields[3], "secure", line_number, line)?;

    let expires = fields[4]
        .parse::<u64>()
        .map_err(|_| CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: format!(
                "expires field must be a non-negative integer, got '{}'",
                fields[4]
            ),
        })?;

    if domain.is_empty() || fields[5].is_empty() {
        return Err(CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: "domain and name fields must not be empty".to_string(),
        });
    }

    Ok(CookieLine::new(
        domain,
        tailmatch,
        path,
        secure,
        expires,
        fields[5].to_string(),
        fields[6].to_string(),
    ))
}

/// Parses a `TRUE`/`FALSE` string field.
fn parse_bool_field(
    value: &str,
    field_name: &str,
    line_number: usize,
    line: &str,
) -> Result<bool, CookieError> {
    match value {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: format!("{field_name} field must be TRUE or FALSE, got '{value}'"),
        }),
    }
}

/// Redacts cookie value (7th field) from a line for safe error messages.
fn redact_line_for_error(line: &str) -> String {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() >= 7 {
        let mut redacted = fields[..6].join("\t");
        redacted.push_str("\t[REDACTED]");
        redacted
    } else {
        line.to_string()
    }
}

/// Parses one `Set-Cookie` header received from `url`.
///
/// Returns `None` for unparseable headers and for cookies whose `Domain`
/// attribute does not cover the responding host.
fn parse_set_cookie(raw: &str, url: &Url, now: u64) -> Option<CookieLine> {
    let host = url.host_str()?.to_ascii_lowercase();
    let parsed = match Cookie::parse(raw) {
        Ok(parsed) => parsed,
        Err(error) => {
            debug!(error = %error, "ignoring unparseable Set-Cookie header");
            return None;
        }
    };
    let name = parsed.name();

    let domain_attr = parsed
        .domain()
        .map(|domain| domain.trim_start_matches('.').to_ascii_lowercase())
        .filter(|domain| !domain.is_empty());
    let (domain, tailmatch) = match domain_attr {
        Some(domain) if domain_matches(&host, &domain) => (format!(".{domain}"), true),
        Some(domain) => {
            warn!(host = %host, domain = %domain, cookie = name, "rejecting cookie for foreign domain");
            return None;
        }
        None => (host, false),
    };

    let expires = match parsed.max_age().map(|max_age| max_age.whole_seconds()) {
        Some(secs) if secs <= 0 => EXPIRED,
        Some(secs) => now.saturating_add(secs.unsigned_abs()),
        None => parsed
            .expires_datetime()
            .map_or(0, |at| u64::try_from(at.unix_timestamp()).unwrap_or(0).max(EXPIRED)),
    };

    let path = parsed
        .path()
        .filter(|path| path.starts_with('/'))
        .map_or_else(|| default_path(url.path()), str::to_string);

    Some(
        CookieLine::new(
            domain,
            tailmatch,
            path,
            parsed.secure().unwrap_or(false),
            expires,
            name.to_string(),
            parsed.value().to_string(),
        )
        .with_http_only(parsed.http_only().unwrap_or(false)),
    )
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// RFC 6265 default-path: the request path up to (not including) its last `/`.
fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => request_path[..idx].to_string(),
    }
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

fn now_secs() -> u64 {
    unix_secs(SystemTime::now())
}

/// Cookie store that mirrors its contents to a cookie file.
///
/// One jar belongs to one account; never point two live jars at the same file.
pub struct PersistentCookieJar {
    path: PathBuf,
    cookies: Mutex<Vec<CookieLine>>,
}

impl fmt::Debug for PersistentCookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentCookieJar")
            .field("path", &self.path)
            .field("cookies", &self.len())
            .finish()
    }
}

impl PersistentCookieJar {
    /// Opens the jar stored at `path`, starting empty when the file is missing.
    ///
    /// Malformed files are ignored with a warning; expired cookies are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] when an existing file cannot be read.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();
        let mut cookies = match fs::File::open(&path) {
            Ok(file) => match parse_netscape_cookies(BufReader::new(file)) {
                Ok(result) => result.cookies,
                Err(CookieError::Io(source)) => return Err(SessionError::io(&path, source)),
                Err(error) => {
                    warn!(error = %error, "ignoring unreadable cookie jar");
                    Vec::new()
                }
            },
            Err(error) if error.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(error) => return Err(SessionError::io(&path, error)),
        };

        let now = now_secs();
        cookies.retain(|cookie| !cookie.is_expired(now));
        debug!(count = cookies.len(), "opened cookie jar");

        Ok(Self {
            path,
            cookies: Mutex::new(cookies),
        })
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of cookies currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when the jar holds no cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns a copy of the stored cookies.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CookieLine> {
        self.lock().clone()
    }

    /// Stores a raw `Set-Cookie` value as if it was received from `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] when the jar file cannot be written.
    pub fn add_cookie_str(&self, set_cookie: &str, url: &Url) -> Result<(), SessionError> {
        let now = now_secs();
        if let Some(cookie) = parse_set_cookie(set_cookie, url, now) {
            upsert(&mut self.lock(), cookie, now);
            self.persist()?;
        }
        Ok(())
    }

    /// Forgets every cookie held in memory; the file is left untouched.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Clears the jar and deletes its file.
    ///
    /// Returns `true` when a file existed and was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] when file removal fails.
    pub fn delete_file(&self) -> Result<bool, SessionError> {
        self.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(SessionError::io(&self.path, error)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CookieLine>> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self) -> Result<(), SessionError> {
        let cookies = self.lock();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SessionError::io(parent, e))?;
        }

        let mut buffer = Vec::new();
        write_netscape_cookies(&cookies, &mut buffer)
            .map_err(|e| SessionError::io(&self.path, e))?;
        fs::write(&self.path, buffer).map_err(|e| SessionError::io(&self.path, e))?;
        set_owner_only_permissions(&self.path)
    }
}

impl CookieStore for PersistentCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let now = now_secs();
        let mut changed = false;
        {
            let mut cookies = self.lock();
            for header in cookie_headers {
                let Ok(raw) = header.to_str() else {
                    continue;
                };
                if let Some(cookie) = parse_set_cookie(raw, url, now) {
                    debug!(domain = %cookie.domain, name = %cookie.name, "storing cookie");
                    upsert(&mut cookies, cookie, now);
                    changed = true;
                }
            }
        }

        if changed && let Err(error) = self.persist() {
            warn!(error = %error, "failed to persist cookie jar");
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let now = now_secs();
        let header = self
            .lock()
            .iter()
            .filter(|cookie| cookie.matches(url, now))
            .filter_map(|cookie| {
                let pair = format!("{}={}", cookie.name, cookie.value());
                if HeaderValue::from_str(&pair).is_ok() {
                    Some(pair)
                } else {
                    warn!(domain = %cookie.domain, name = %cookie.name, "skipping cookie not valid in a header");
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            None
        } else {
            HeaderValue::from_str(&header).ok()
        }
    }
}

fn upsert(cookies: &mut Vec<CookieLine>, cookie: CookieLine, now: u64) {
    cookies.retain(|existing| !existing.same_slot(&cookie));
    if !cookie.is_expired(now) {
        cookies.push(cookie);
    }
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<(), SessionError> {
    use std::os::unix::fs::PermissionsExt;

    let permissions = fs::Permissions::from_mode(0o600);
    fs::set_permissions(path, permissions).map_err(|e| SessionError::io(path, e))
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<(), SessionError> {
    Ok(())
}

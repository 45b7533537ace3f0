//! Cookie-backed HTTP session.
//!
//! This module provides the [`Connector`] used by the login flow and by
//! authenticated API calls:
//!
//! - One persistent cookie jar per account, stored as a Netscape cookie file
//!   named after a hash of the username
//! - Two transports sharing that jar, with and without redirect following
//! - Status tracking instead of status errors
//! - Optional numbered capture of POST response bodies

mod account;
mod capture;
mod config;
mod connector;
mod cookie_jar;
mod error;

pub use account::AccountId;
pub use capture::ResponseCapture;
pub use config::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, SessionConfig};
pub use connector::{Connector, PostBody, RequestOptions};
pub use cookie_jar::{
    CookieError, CookieLine, ParseResult, PersistentCookieJar, parse_netscape_cookies,
    write_netscape_cookies,
};
pub use error::SessionError;

//! Garmin SSO login and OAuth token exchange.
//!
//! [`LoginMachine`] walks the SSO web flow the way the mobile apps do and
//! trades the resulting service ticket for OAuth1 and then OAuth2 tokens.
//!
//! # Example
//!
//! ```no_run
//! use garmin_connect::login::{Credentials, LoginMachine};
//! use garmin_connect::session::{AccountId, Connector, SessionConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = Credentials::new("runner@example.com", "password", "key", "secret")?
//!     .with_token_store("/tmp/garmin-tokens");
//! let account = AccountId::from_username(credentials.username())?;
//! let mut connector = Connector::new(&account, SessionConfig::default())?;
//!
//! let outcome = LoginMachine::new(credentials).login(&mut connector).await?;
//! println!("cached: {}", outcome.from_cache);
//! # Ok(())
//! # }
//! ```

mod credentials;
mod endpoints;
mod error;
mod machine;
mod scrape;

pub use credentials::Credentials;
pub use endpoints::Endpoints;
pub use error::{AuthenticationFailure, EXCERPT_MAX_CHARS, FailureKind, LoginError};
pub use machine::{LoginMachine, LoginOutcome, LoginState};
pub use scrape::{SsoPatterns, extract_named};

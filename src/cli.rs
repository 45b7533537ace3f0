//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use garmin_connect::session::DEFAULT_REQUEST_TIMEOUT_SECS;

/// Log into Garmin Connect and call its API with the resulting session.
///
/// Credentials are read from a JSON file with `username`, `password`,
/// `consumer_key`, `consumer_secret` and optional `token_store` fields.
#[derive(Parser, Debug)]
#[command(name = "garmin-connect")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// JSON credentials file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub credentials: PathBuf,

    /// Directory for per-account cookie jars (default: system temp dir)
    #[arg(long, value_name = "DIR")]
    pub cookie_dir: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure_tls: bool,

    /// Per-request timeout in seconds (1-600)
    #[arg(short = 't', long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout: u64,

    /// Write each POST response body to numbered files in this directory
    #[arg(long, value_name = "DIR")]
    pub capture_dir: Option<PathBuf>,

    /// Ignore cached tokens whose expiry has passed
    #[arg(long)]
    pub reject_expired: bool,

    /// Override the SSO origin (requires --api-origin)
    #[arg(long, value_name = "URL", requires = "api_origin", hide = true)]
    pub sso_origin: Option<String>,

    /// Override the API origin (requires --sso-origin)
    #[arg(long, value_name = "URL", requires = "sso_origin", hide = true)]
    pub api_origin: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Log in (or load cached tokens) and report the result
    Login,
    /// Delete the cookie jar and the cached tokens
    Logout,
    /// Log in, then GET an API path and print the JSON response
    Get {
        /// API path, e.g. /userprofile-service/socialProfile
        path: String,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

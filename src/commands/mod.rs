//! CLI command handlers.

mod get;
mod login;
mod logout;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use garmin_connect::{CachePolicy, Credentials, Endpoints, GarminConnect, SessionConfig};
use tracing::debug;
use zeroize::Zeroize;

use crate::cli::Args;

pub use get::run_get_command;
pub use login::run_login_command;
pub use logout::run_logout_command;

/// Builds the client described by the command line.
pub fn build_client(args: &Args) -> Result<GarminConnect> {
    let credentials = load_credentials(&args.credentials)?;
    let config = session_config(args);

    let mut client = GarminConnect::new(credentials, config)?;
    if let (Some(sso), Some(api)) = (&args.sso_origin, &args.api_origin) {
        client = client.with_endpoints(Endpoints::with_hosts(sso, api)?);
    }
    if args.reject_expired {
        client = client.with_cache_policy(CachePolicy::RejectExpired);
    }
    Ok(client)
}

fn session_config(args: &Args) -> SessionConfig {
    let mut config = SessionConfig::default().with_accept_invalid_certs(args.insecure_tls);
    let request_timeout = Duration::from_secs(args.timeout);
    let connect_timeout = config.connect_timeout.min(request_timeout);
    config = config.with_timeouts(connect_timeout, request_timeout);
    if let Some(dir) = &args.cookie_dir {
        config = config.with_cookie_dir(dir);
    }
    if let Some(dir) = &args.capture_dir {
        config = config.with_response_capture_dir(dir);
    }
    config
}

/// Reads a JSON credentials file into [`Credentials`].
fn load_credentials(path: &Path) -> Result<Credentials> {
    let mut raw = fs::read_to_string(path)
        .with_context(|| format!("Cannot read credentials file '{}'", path.display()))?;
    let parsed: Result<HashMap<String, String>, _> = serde_json::from_str(&raw);
    raw.zeroize();

    let map = parsed.with_context(|| {
        format!(
            "Credentials file '{}' must be a JSON object of strings",
            path.display()
        )
    })?;
    debug!(path = %path.display(), fields = map.len(), "loaded credentials file");
    Ok(Credentials::from_map(map)?)
}

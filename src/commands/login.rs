//! `login` command handler.

use anyhow::Result;
use garmin_connect::GarminConnect;
use tracing::info;

pub async fn run_login_command(client: &mut GarminConnect) -> Result<()> {
    let outcome = client.login().await?;
    let from_cache = outcome.from_cache;
    let expires_at = outcome.oauth2.expires_at;

    if from_cache {
        info!("Logged in with cached tokens");
    } else {
        info!(expires_at = ?expires_at, "Logged in");
    }
    println!("{}", if from_cache { "cached" } else { "authenticated" });
    Ok(())
}

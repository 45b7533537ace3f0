//! `logout` command handler.

use anyhow::{Result, anyhow};
use garmin_connect::GarminConnect;
use tracing::info;

pub fn run_logout_command(client: &mut GarminConnect) -> Result<()> {
    let jar = client.connector().jar_path().to_path_buf();
    client
        .logout()
        .map_err(|error| anyhow!("Failed to log out: {error}"))?;

    info!(jar = %jar.display(), "Cleared session cookies");
    if let Some(store) = client.machine().token_store() {
        info!(dir = %store.dir().display(), "Cleared cached tokens");
    }
    Ok(())
}

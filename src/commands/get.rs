//! `get` command handler: bearer-authenticated GET against the API.

use anyhow::{Context, Result};
use garmin_connect::GarminConnect;
use tracing::debug;

pub async fn run_get_command(
    client: &mut GarminConnect,
    path: &str,
    params: &[(String, String)],
) -> Result<()> {
    client.login().await?;

    let params: Vec<(&str, &str)> = params
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    let body: serde_json::Value = client.get_json(path, &params).await?;
    debug!(path, "API response decoded");

    let rendered = serde_json::to_string_pretty(&body).context("Failed to render response")?;
    println!("{rendered}");
    Ok(())
}

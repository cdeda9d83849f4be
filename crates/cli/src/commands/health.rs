// `dontpad health`: collab server reachability as seen by the server.

use anyhow::bail;
use dontpad_common::types::CollabHealth;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

pub async fn run(client: &ApiClient, format: OutputFormat) -> anyhow::Result<()> {
    let health = client.collab_health().await?;
    output::print_output(format, &health, format_human)?;
    if !health.ok {
        bail!("collab server at {} is unreachable", health.connection_string);
    }
    Ok(())
}

fn format_human(health: &CollabHealth) -> String {
    let state = if health.ok { "reachable" } else { "UNREACHABLE" };
    format!("collab server {}:{} ({}) is {state}", health.host, health.port, health.connection_string)
}

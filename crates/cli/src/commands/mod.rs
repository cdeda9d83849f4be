// CLI subcommand dispatch.

use clap::Subcommand;

use crate::client::ApiClient;
use crate::output::OutputFormat;

pub mod health;
pub mod pin_hash;
pub mod security;
pub mod versions;

#[derive(Subcommand)]
pub enum Command {
    /// List, save, export, delete and restore document versions
    #[command(subcommand)]
    Versions(versions::VersionsCommand),
    /// Show whether a document is PIN-protected
    Security(security::SecurityArgs),
    /// Print the hash stored for a PIN
    PinHash(pin_hash::PinHashArgs),
    /// Check that the collab server is reachable
    Health,
}

pub async fn run(cmd: Command, server: &str, format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        // Needs no server.
        Command::PinHash(args) => pin_hash::run(args, format),
        Command::Versions(cmd) => versions::run(cmd, &ApiClient::new(server)?, format).await,
        Command::Security(args) => security::run(args, &ApiClient::new(server)?, format).await,
        Command::Health => health::run(&ApiClient::new(server)?, format).await,
    }
}

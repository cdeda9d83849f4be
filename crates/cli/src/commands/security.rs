// `dontpad security`: protection status of a document.

use clap::Args;
use dontpad_common::types::SecurityStatus;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct SecurityArgs {
    /// Document id as it appears in the URL.
    document: String,
}

pub async fn run(args: SecurityArgs, client: &ApiClient, format: OutputFormat) -> anyhow::Result<()> {
    let status = client.security(&args.document).await?;
    output::print_output(format, &status, |s| format_human(&args.document, s))?;
    Ok(())
}

fn format_human(document: &str, status: &SecurityStatus) -> String {
    if status.is_protected {
        format!("{document}: protected by PIN")
    } else {
        format!("{document}: not protected")
    }
}

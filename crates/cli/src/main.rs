// dontpad CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod client;
mod commands;
mod exit_code;
mod output;

use client::DEFAULT_SERVER_URL;
use exit_code::ExitCode;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "dontpad", about = "Version history and access for dontpad documents")]
struct Cli {
    /// Base URL of the dontpad server.
    #[arg(long, global = true, env = "DONTPAD_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Force JSON output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::detect(cli.json);
    match commands::run(cli.command, &cli.server, format).await {
        Ok(()) => ExitCode::Success.into(),
        Err(error) => {
            output::print_anyhow_error(format, &error);
            ExitCode::from_error(&error).into()
        }
    }
}

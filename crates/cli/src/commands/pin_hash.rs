// `dontpad pin-hash`: the value a protected document stores for a PIN.

use clap::Args;
use dontpad_common::pin::hash_pin;
use serde::Serialize;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct PinHashArgs {
    pin: String,
}

#[derive(Debug, Serialize)]
struct PinHash {
    hash: String,
}

pub fn run(args: PinHashArgs, format: OutputFormat) -> anyhow::Result<()> {
    if args.pin.trim().is_empty() {
        anyhow::bail!("PIN must not be empty");
    }
    let result = PinHash { hash: hash_pin(&args.pin) };
    output::print_output(format, &result, |r| r.hash.clone())?;
    Ok(())
}

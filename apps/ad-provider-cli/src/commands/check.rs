//! Test the directory connection

use std::path::PathBuf;

use clap::Args;
use serde_json::Value;

use super::connect;
use crate::error::CliResult;
use crate::models::DesiredState;

/// Bind to the directory with the configured credentials
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to desired-state file (for the provider configuration)
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,
}

/// Execute the check command
pub async fn execute(args: CheckArgs) -> CliResult<()> {
    let desired = DesiredState::load(&args.file)?;
    let provider = connect(&desired).await?;
    provider.shutdown().await?;

    let target = desired
        .provider
        .get("ip")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| std::env::var("AD_IP").ok())
        .unwrap_or_default();
    println!("\x1b[32m✓\x1b[0m Connected to {target}");
    Ok(())
}

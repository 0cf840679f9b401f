//! Delete everything recorded in the state file

use std::path::PathBuf;

use ad_provider::ProviderService;
use clap::Args;
use tracing::info;

use super::{confirm, connect, state_path};
use crate::error::CliResult;
use crate::models::{DesiredState, StateFile};

/// Delete all resources recorded in the state file
#[derive(Args, Debug)]
pub struct DestroyArgs {
    /// Path to desired-state file (for the provider configuration)
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Path to state file
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Execute the destroy command
pub async fn execute(args: DestroyArgs) -> CliResult<()> {
    let desired = DesiredState::load(&args.file)?;
    let path = state_path(args.state);
    let mut state = StateFile::load(&path)?;

    if state.resources.is_empty() {
        println!("Nothing to destroy.");
        return Ok(());
    }

    let order = destroy_order(&state);
    println!("Will delete:");
    for address in &order {
        println!("  \x1b[31m-\x1b[0m {address}");
    }

    if !confirm(format!("Delete {} resource(s)?", order.len()), args.yes)? {
        println!("Cancelled.");
        return Ok(());
    }

    let provider = connect(&desired).await?;
    for address in order {
        let Some(entry) = state.get(&address).cloned() else {
            continue;
        };

        if let Err(e) = provider.delete(&entry.resource_type, entry.state).await {
            state.save(&path)?;
            provider.shutdown().await?;
            return Err(e.into());
        }
        info!(address = %address, "Resource deleted");
        println!("  \x1b[32m✓\x1b[0m Deleted {address}");

        state.remove(&address);
        state.save(&path)?;
    }

    provider.shutdown().await?;
    println!();
    println!("Destroy complete.");
    Ok(())
}

/// Recorded addresses, last applied first.
fn destroy_order(state: &StateFile) -> Vec<String> {
    state.resources.iter().rev().map(|e| e.address()).collect()
}

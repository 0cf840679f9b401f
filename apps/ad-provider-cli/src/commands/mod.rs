//! CLI command implementations

pub mod apply;
pub mod check;
pub mod destroy;
pub mod query;
pub mod schema;

use std::io::IsTerminal;
use std::path::PathBuf;

use ad_provider::{AdProvider, ProviderService};
use dialoguer::Confirm;
use tracing::debug;

use crate::error::{CliError, CliResult};
use crate::models::DesiredState;

/// Default state file path.
pub const DEFAULT_STATE_FILE: &str = "adctl.state.json";

/// Configure a provider from the `provider` block of a desired-state file.
pub async fn connect(desired: &DesiredState) -> CliResult<AdProvider> {
    let provider = AdProvider::new();
    debug!("Configuring provider");
    provider.configure(desired.provider_config()).await?;
    Ok(provider)
}

/// Ask for confirmation unless `yes` was given.
pub fn confirm(prompt: String, yes: bool) -> CliResult<bool> {
    if yes {
        return Ok(true);
    }

    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation(
            "Cannot confirm in non-interactive mode. Use --yes to skip confirmation.".to_string(),
        ));
    }

    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(e.to_string()))
}

/// State file path, defaulting next to the working directory.
pub fn state_path(state: Option<PathBuf>) -> PathBuf {
    state.unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE))
}

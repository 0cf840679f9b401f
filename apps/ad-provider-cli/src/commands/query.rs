//! Read a data source

use std::path::PathBuf;

use ad_provider::ProviderService;
use clap::Args;
use serde_json::{Map, Value};

use super::connect;
use crate::error::{CliError, CliResult};
use crate::models::DesiredState;

/// Read a data source and print its values as JSON
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Path to desired-state file (for the provider configuration)
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Data source type, e.g. ad_group
    pub data_source: String,

    /// Lookup attribute as key=value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

/// Execute the query command
pub async fn execute(args: QueryArgs) -> CliResult<()> {
    let desired = DesiredState::load(&args.file)?;
    let config = parse_assignments(&args.set)?;

    let provider = connect(&desired).await?;
    let result = provider
        .read_data_source(&args.data_source, Value::Object(config))
        .await;
    provider.shutdown().await?;

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}

/// Parse `key=value` pairs. Values that parse as JSON scalars or arrays keep
/// their type; anything else is a string.
pub fn parse_assignments(pairs: &[String]) -> CliResult<Map<String, Value>> {
    let mut config = Map::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            return Err(CliError::Validation(format!(
                "Expected key=value, got '{pair}'"
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::Validation(format!("Empty key in '{pair}'")));
        }

        let value = match serde_json::from_str::<Value>(raw) {
            Ok(v @ (Value::Bool(_) | Value::Number(_) | Value::Array(_))) => v,
            _ => Value::String(raw.to_string()),
        };
        config.insert(key.to_string(), value);
    }
    Ok(config)
}

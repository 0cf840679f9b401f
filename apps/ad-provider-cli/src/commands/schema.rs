//! Print the provider schema

use ad_provider::{AdProvider, ProviderService};
use clap::Args;

use crate::error::CliResult;

/// Print the provider, resource and data source schemas as JSON
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Only print the schema of this resource or data source type
    #[arg(long = "type")]
    pub type_name: Option<String>,
}

/// Execute the schema command
pub fn execute(args: SchemaArgs) -> CliResult<()> {
    let schema = AdProvider::new().schema();

    let output = match args.type_name {
        None => serde_json::to_value(&schema)?,
        Some(name) => serde_json::json!({
            "resource": schema.resources.get(&name),
            "data_source": schema.data_sources.get(&name),
        }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

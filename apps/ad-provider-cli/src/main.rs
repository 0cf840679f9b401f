//! adctl - apply Active Directory desired state from the command line
//!
//! - Plan and apply a YAML file of AD resources, recording state in JSON
//! - Destroy everything previously applied
//! - Query data sources and print the provider schema

use clap::{Parser, Subcommand};

mod commands;
mod error;
mod logging;
mod models;

use error::CliResult;

/// adctl - Active Directory desired-state tool
#[derive(Parser)]
#[command(name = "adctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a desired-state file
    Apply(commands::apply::ApplyArgs),

    /// Delete every resource recorded in the state file
    Destroy(commands::destroy::DestroyArgs),

    /// Read a data source
    Query(commands::query::QueryArgs),

    /// Print the provider schema
    Schema(commands::schema::SchemaArgs),

    /// Test the directory connection
    Check(commands::check::CheckArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Apply(args) => commands::apply::execute(args).await,
        Commands::Destroy(args) => commands::destroy::execute(args).await,
        Commands::Query(args) => commands::query::execute(args).await,
        Commands::Schema(args) => commands::schema::execute(args),
        Commands::Check(args) => commands::check::execute(args).await,
    }
}

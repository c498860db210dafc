//! catsync - declarative catalog importer
//!
//! Pulls records from upstream sources (local files, Backstage, inline
//! config), projects them into typed catalog entries, and converges the
//! remote catalog to the configured desired state on every run.

use clap::{Parser, Subcommand};

mod commands;
mod error;
mod progress;

use error::CliResult;

/// catsync - sync external sources into a typed catalog
#[derive(Parser)]
#[command(name = "catsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync a config file into the catalog
    Sync(commands::sync::SyncArgs),

    /// Sync a Backstage software catalog with a generated config
    Backstage(commands::backstage::BackstageArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

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
        Commands::Sync(args) => commands::sync::execute(args).await,
        Commands::Backstage(args) => commands::backstage::execute(args).await,
    }
}

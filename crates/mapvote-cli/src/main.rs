//! Operator CLI for the map voting engine
//!
//! Validates configuration, inspects the candidate catalog and runs
//! deterministic offline sessions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{catalog, check_config, simulate};

#[derive(Parser)]
#[command(name = "mapvote")]
#[command(about = "Map nomination and voting engine tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (created with defaults if missing)
    #[arg(short, long, global = true, default_value = "mapvote.toml")]
    config: PathBuf,

    /// Map list file (created with defaults if missing)
    #[arg(short, long, global = true, default_value = "maplist.txt")]
    maplist: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the config file and print the effective settings
    CheckConfig,

    /// Show the catalog and nomination menu for a current map
    Catalog(catalog::CatalogArgs),

    /// Run a deterministic session against a simulated server
    Simulate(simulate::SimulateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    match cli.command {
        Commands::CheckConfig => check_config::run(&cli.config).await?,
        Commands::Catalog(args) => catalog::run(&cli.config, &cli.maplist, args).await?,
        Commands::Simulate(args) => simulate::run(&cli.config, &cli.maplist, args).await?,
    }

    Ok(())
}

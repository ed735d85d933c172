use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "recon",
    about = "Recon — back-office reconciliation against the accounting ledger",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "recon.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Check a reference against a store's ledger
    Verify(VerifyArgs),
    /// Ask a running server to repair stale order statuses
    Repair(RepairArgs),
    /// Validate the configuration file
    CheckConfig,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Override `bind_addr` from the configuration
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Invoice reference, or BL number with --bl
    pub reference: String,
    #[arg(short, long)]
    pub store: u32,
    #[arg(long)]
    pub supplier: Option<String>,
    /// Search the BL column only
    #[arg(long)]
    pub bl: bool,
}

#[derive(Args)]
pub struct RepairArgs {
    /// Server base URL; defaults to the configured bind address
    #[arg(long)]
    pub server: Option<String>,
}

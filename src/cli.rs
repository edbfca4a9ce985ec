use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "signalspool")]
#[command(about = "Durable on-disk buffer for telemetry samples", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the stores, run periodic eviction and serve /health and /stats
    Run(RunArgs),
    /// Print store and queue statistics as JSON and exit
    Inspect(InspectArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Configuration file (defaults to $SIGNALSPOOL_CONFIG or config/signalspool.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the status endpoint bind address
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct InspectArgs {
    /// Configuration file (defaults to $SIGNALSPOOL_CONFIG or config/signalspool.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

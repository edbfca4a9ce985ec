mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use signalspool::config::Config;
use signalspool::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let mut config = Config::load_or_default_path(args.config)?;
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }
            server::run(config).await?
        }
        Commands::Inspect(args) => {
            let config = Config::load_or_default_path(args.config)?;
            let status = server::inspect(&config)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

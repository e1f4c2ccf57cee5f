//! mcphost - MCP host CLI
//!
#![doc = "mcphost - broker between a language model and MCP capability servers"]
#![doc = "Main entry point for the mcphost application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mcphost::cli::{Cli, Commands};
use mcphost::commands;
use mcphost::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    config.validate()?;

    match cli.command {
        Commands::Ask { message } => {
            tracing::debug!("Asking: {}", message);
            commands::ask::run_ask(config, message).await?;
            Ok(())
        }
        Commands::Chat => {
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Commands::Servers { json } => {
            tracing::info!("Listing MCP servers");
            commands::servers::run_servers(config, json).await?;
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "mcphost=debug" } else { "mcphost=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Answers go to stdout, so logs stay on stderr.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use blocksmith::cli::Cli;
use blocksmith::core::Engine;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Starting Blocksmith v{}", env!("CARGO_PKG_VERSION"));

    // Create the core engine with configuration
    let engine = Engine::new(cli.config.as_deref()).await?;

    // Execute the requested command
    cli.execute(engine).await
}

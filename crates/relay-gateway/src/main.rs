mod cli;
mod config;
mod service;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use config::Config;
use service::GatewayService;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load()?;

    // Logs go to stderr; stdout carries command output or the stdio transport
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    relay_logging::init_logging(level, config.logging.format)?;
    debug!("Running {:?}", cli.command);

    GatewayService::new(config).run(cli.command).await
}

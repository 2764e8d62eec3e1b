//! Cardfleet CLI entry point.

use clap::Parser;

use cardfleet::cli::{commands, Cli, Commands};
use cardfleet::infrastructure::config::ConfigLoader;
use cardfleet::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => cardfleet::cli::handle_error(err, cli.json),
    };

    // Held for the process lifetime so buffered file logs are flushed on exit.
    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => cardfleet::cli::handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Run => commands::run::execute(config, cli.json).await,
        Commands::Sync => commands::sync::execute(config, cli.json).await,
        Commands::Config => commands::config::execute(config, cli.json),
    };

    if let Err(err) = result {
        cardfleet::cli::handle_error(err, cli.json);
    }
}

//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line interface.
#[derive(Parser, Debug)]
#[command(name = "cardfleet")]
#[command(about = "Cardfleet - Telegram bots for visit cards", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./cardfleet.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bot manager until interrupted
    Run,

    /// Run a single reconciliation cycle and print its report
    Sync,

    /// Print the effective configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_global_flags() {
        let cli = Cli::parse_from(["cardfleet", "run", "--config", "/etc/cardfleet.yaml", "--json"]);
        assert!(matches!(cli.command, Commands::Run));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/cardfleet.yaml")));
        assert!(cli.json);
    }

    #[test]
    fn test_parse_sync_defaults() {
        let cli = Cli::parse_from(["cardfleet", "sync"]);
        assert!(matches!(cli.command, Commands::Sync));
        assert!(!cli.json);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_unknown_command_fails() {
        assert!(Cli::try_parse_from(["cardfleet", "serve"]).is_err());
    }
}

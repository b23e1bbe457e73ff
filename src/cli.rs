use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "logkeeper")]
#[command(about = "Rule-driven log archiving and purging", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $LOGKEEPER_CONFIG or config/logkeeper.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the archive timer until interrupted
    Run,
    /// Move matching entries from sources into archives once
    Archive(PassArgs),
    /// Delete matching entries from archives once
    Purge(PassArgs),
    /// Validate and print the effective configuration
    Check,
}

#[derive(clap::Args, Debug)]
pub struct PassArgs {
    /// Print the execution report as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::parse_from(["logkeeper", "--config", "/etc/logkeeper.toml", "run"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/logkeeper.toml")));
        assert!(matches!(cli.command, Commands::Run));

        let cli = Cli::parse_from(["logkeeper", "purge", "--json"]);
        assert!(matches!(cli.command, Commands::Purge(PassArgs { json: true })));

        let cli = Cli::parse_from(["logkeeper", "archive", "--config", "local.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("local.toml")));
        assert!(matches!(cli.command, Commands::Archive(PassArgs { json: false })));
    }
}

mod cli;
mod daemon;

use clap::Parser;
use cli::{Cli, Commands};
use logkeeper::archive::ArchiveAction;
use logkeeper::config::{Config, default_config_path};
use logkeeper::observability;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let log_filter = observability::init_tracing();

    let cli = Cli::parse();

    let (config, config_path) = match cli.config {
        // An explicit path must exist
        Some(path) => {
            dotenvy::dotenv().ok();
            (Config::load_file(path.clone())?, path)
        }
        None => {
            let config = Config::load()?;
            (config, default_config_path())
        }
    };

    if let Err(e) = log_filter.apply_configured(&config.logging.filter) {
        warn!(error = %e, "Keeping bootstrap log filter");
    }

    match cli.command {
        Commands::Run => daemon::run(config, config_path).await?,
        Commands::Archive(args) => {
            daemon::run_once(config, ArchiveAction::MoveToArchive, args.json).await?
        }
        Commands::Purge(args) => {
            daemon::run_once(config, ArchiveAction::DeleteFromArchive, args.json).await?
        }
        Commands::Check => print!("{}", config.to_toml()?),
    }

    Ok(())
}

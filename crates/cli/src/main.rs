use std::env;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use clickhouse_backup::cli::{Cli, Commands};
use clickhouse_backup::config::{self, Config, LoadedConfig, Settings};
use clickhouse_backup::{commands, logging, App};
use clickhouse_backup_client::HttpDatabase;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging needs the config, so a broken config is reported after init.
    let loaded = config::load_config(&cli.config_folder);
    if let Err(e) = logging::init(cli.verbose, loaded.as_ref().ok().map(|l| &l.config.logging)) {
        eprintln!("failed to set up logging: {e:#}");
        return ExitCode::FAILURE;
    }
    if let Ok(LoadedConfig {
        wrote_default: Some(path),
        ..
    }) = &loaded
    {
        info!(path = ?path, "wrote default config");
    }

    match run(cli, loaded.map(|l| l.config)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: Result<Config>) -> Result<()> {
    let mut config = config?;
    config.apply_env(|key| env::var(key).ok())?;
    let settings = Settings::try_from(config).context("invalid configuration")?;

    let mut app = App::open(cli.config_folder, settings).await?;
    match cli.command {
        Commands::Backup(args) => {
            let db = HttpDatabase::new(&app.settings.connection);
            let summary = commands::backup::run(&mut app, &db, args.force_full).await?;
            info!(
                artifact = %summary.name,
                kind = %summary.kind,
                evicted = summary.evicted.len(),
                "backup finished"
            );
            Ok(())
        }
        Commands::List => commands::list::run(&app),
        Commands::Restore(args) => commands::restore::run(&app, &args),
    }
}

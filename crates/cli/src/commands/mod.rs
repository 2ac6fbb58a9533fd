use std::path::PathBuf;

use anyhow::{Context, Result};
use clickhouse_backup_core::ChainMap;
use clickhouse_backup_storage::BackupRepository;

use crate::config::Settings;

pub mod backup;
pub mod list;
pub mod restore;

/// State shared by all subcommands for one invocation.
pub struct App {
    pub config_folder: PathBuf,
    pub settings: Settings,
    pub repo: BackupRepository,
    /// Rebuilt from the backup target on open; never persisted.
    pub chains: ChainMap,
}

impl App {
    pub async fn open(config_folder: PathBuf, settings: Settings) -> Result<Self> {
        let repo = BackupRepository::open(&settings.target)
            .await
            .with_context(|| format!("opening {} backup target", settings.target.label()))?;
        Self::with_repository(config_folder, settings, repo).await
    }

    pub async fn with_repository(
        config_folder: PathBuf,
        settings: Settings,
        repo: BackupRepository,
    ) -> Result<Self> {
        let chains = repo
            .load_chains()
            .await
            .with_context(|| format!("listing backups in {}", repo.location()))?;
        Ok(Self {
            config_folder,
            settings,
            repo,
            chains,
        })
    }
}

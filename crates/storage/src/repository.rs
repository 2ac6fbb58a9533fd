use std::sync::Arc;

use anyhow::Result;
use clickhouse_backup_core::{Artifact, BackupTarget, ChainMap, Timestamp};
use tracing::{error, info, warn};

use crate::local_store::LocalStore;
use crate::s3_store::S3Store;
use crate::store::ArtifactStore;

/// Chain bookkeeping on top of a raw artifact store.
#[derive(Clone)]
pub struct BackupRepository {
    store: Arc<dyn ArtifactStore>,
}

/// Outcome of a best-effort eviction pass.
#[derive(Debug, Default)]
pub struct EvictionReport {
    pub deleted: Vec<String>,
    /// Artifact name and error for every deletion that failed.
    pub failed: Vec<(String, String)>,
}

impl EvictionReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl BackupRepository {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Opens the store matching the configured target.
    pub async fn open(target: &BackupTarget) -> Result<Self> {
        let store: Arc<dyn ArtifactStore> = match target {
            BackupTarget::File { dir } | BackupTarget::Disk { dir, .. } => {
                Arc::new(LocalStore::new(dir.clone()))
            }
            BackupTarget::S3(location) | BackupTarget::S3Disk { location, .. } => {
                Arc::new(S3Store::connect(location).await?)
            }
        };
        Ok(Self::new(store))
    }

    /// Rebuilds the chain map from the store. Incrementals without a base are
    /// deleted on the spot; failing to delete one is logged and tolerated.
    pub async fn load_chains(&self) -> Result<ChainMap> {
        let names = self.store.list().await?;
        let reconstruction = ChainMap::reconstruct(&names);

        for orphan in &reconstruction.orphans {
            match self.store.delete(orphan).await {
                Ok(()) => warn!(artifact = %orphan, "deleted incremental backup without base"),
                Err(e) => error!(artifact = %orphan, error = %e, "could not delete orphaned backup"),
            }
        }

        info!(
            location = %self.store.describe(),
            chains = reconstruction.chains.len(),
            "loaded existing backups"
        );
        Ok(reconstruction.chains)
    }

    /// Deletes the given chains, incrementals before their full backup.
    ///
    /// Every artifact is attempted even after a failure. Evicted chains leave
    /// the map whether or not all their artifacts could be removed; leftovers
    /// are picked up again on the next reconstruction.
    pub async fn evict(&self, chains: &mut ChainMap, victims: &[Timestamp]) -> EvictionReport {
        let mut report = EvictionReport::default();
        for timestamp in victims {
            let Some(full) = chains.remove(timestamp) else {
                continue;
            };
            info!(artifact = %full.name(), incrementals = full.incrementals().len(), "evicting backup chain");
            for name in full.deletion_order() {
                match self.store.delete(&name).await {
                    Ok(()) => report.deleted.push(name),
                    Err(e) => {
                        error!(artifact = %name, error = %e, "could not delete backup");
                        report.failed.push((name, format!("{e:#}")));
                    }
                }
            }
        }
        report
    }

    pub fn location(&self) -> String {
        self.store.describe()
    }
}

use anyhow::{bail, Context, Result};
use clickhouse_backup_client::{BackupRunner, Database};
use clickhouse_backup_core::{plan_next, Artifact, BackupKind, Statement, Timestamp};
use tracing::{info, warn};

use super::App;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSummary {
    pub name: String,
    pub kind: BackupKind,
    pub evicted: Vec<String>,
}

pub async fn run(app: &mut App, db: &dyn Database, force_full: bool) -> Result<BackupSummary> {
    run_at(app, db, force_full, Timestamp::now()).await
}

/// Plans, creates and records one backup, then evicts old chains.
///
/// Evictions are decided before the backup is submitted but only carried out
/// once the database reports success, so a failed run never loses a chain.
pub async fn run_at(
    app: &mut App,
    db: &dyn Database,
    force_full: bool,
    now: Timestamp,
) -> Result<BackupSummary> {
    let settings = &app.settings;
    let plan = plan_next(
        &app.chains,
        &settings.retention,
        force_full,
        settings.file_type.as_deref(),
        now,
    )?;

    let name = plan.backup.name();
    let kind = plan.backup.kind();
    let statement = Statement::backup(settings.scope.clone(), settings.target.address(&name))
        .base(plan.base.as_ref().map(|b| settings.target.address(&b.name())))
        .build()?;

    info!(artifact = %name, %kind, base = ?plan.base.as_ref().map(|b| b.name()), "creating a new backup");
    BackupRunner::new(db)
        .poll_interval(settings.poll_interval)
        .run(&statement)
        .await
        .with_context(|| format!("backup {name} failed"))?;

    app.chains.record(plan.backup);

    let mut evicted = Vec::new();
    if !plan.evictions.is_empty() {
        info!(
            chains = plan.evictions.len(),
            max_full_backups = settings.retention.max_full_chains,
            "removing old backup chains"
        );
        let report = app.repo.evict(&mut app.chains, &plan.evictions).await;
        evicted = report.deleted;
        if !report.failed.is_empty() {
            for (artifact, error) in &report.failed {
                warn!(%artifact, %error, "backup left behind");
            }
            bail!(
                "backup {name} created, but {} old artifact(s) could not be deleted",
                report.failed.len()
            );
        }
    }

    Ok(BackupSummary {
        name,
        kind,
        evicted,
    })
}

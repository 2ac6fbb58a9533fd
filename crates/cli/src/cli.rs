//! CLI argument parsing with clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Create ClickHouse backups with incremental chains and retention.
#[derive(Parser, Debug)]
#[command(name = "clickhouse-backup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Folder holding default.toml / config.toml, e.g. /etc/clickhouse-backup
    #[arg(short = 'c', long, env = "CH_BACKUP_CONFIG_FOLDER")]
    pub config_folder: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a full or incremental backup and apply retention
    Backup(BackupArgs),

    /// List existing backup chains
    List,

    /// Print RESTORE statements for a backup
    Restore(RestoreArgs),
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Start a new chain regardless of the incremental limit
    #[arg(short, long)]
    pub force_full: bool,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Artifact name to restore; must match exactly
    #[arg(short, long)]
    pub file: String,

    /// Restore only this table (`db.table`, or `db.table AS db.other`)
    #[arg(long, conflicts_with = "database")]
    pub table: Option<String>,

    /// Restore only this database
    #[arg(long)]
    pub database: Option<String>,

    /// Allow restoring into non-empty tables
    #[arg(long)]
    pub overwrite: bool,
}

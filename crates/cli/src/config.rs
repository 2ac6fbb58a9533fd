use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clickhouse_backup_client::{ConnectionConfig, DEFAULT_POLL_INTERVAL};
use clickhouse_backup_core::policy::{DEFAULT_MAX_FULL_CHAINS, DEFAULT_MAX_INCREMENTALS};
use clickhouse_backup_core::{BackupTarget, ConfigError, RetentionPolicy, Scope, TargetParams};
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "default.toml";
pub const USER_CONFIG_FILE: &str = "config.toml";

const DEFAULT_TEMPLATE: &str = include_str!("../assets/default.toml");

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub clickhouse: ClickhouseConfig,
    pub backup: BackupConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ClickhouseConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub secure: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct BackupConfig {
    pub target: Option<String>,
    pub dir: Option<PathBuf>,
    pub disk: Option<String>,
    pub file_type: Option<String>,
    pub max_incremental_backups: Option<usize>,
    pub max_full_backups: Option<usize>,
    pub ignored_databases: Option<Vec<String>>,
    pub poll_interval_secs: Option<u64>,
    pub s3: S3Config,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub path: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    pub level: Option<String>,
}

/// A parsed config folder.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    /// Set when `default.toml` was missing and has just been written. Loading
    /// happens before logging is set up, so reporting it is up to the caller.
    pub wrote_default: Option<PathBuf>,
}

/// Loads `default.toml` (writing it on first use) and merges `config.toml`
/// over it when present.
pub fn load_config(folder: &Path) -> Result<LoadedConfig> {
    let default_path = folder.join(DEFAULT_CONFIG_FILE);
    let mut wrote_default = None;
    if !default_path.is_file() {
        std::fs::create_dir_all(folder)
            .with_context(|| format!("creating config folder {folder:?}"))?;
        std::fs::write(&default_path, DEFAULT_TEMPLATE)
            .with_context(|| format!("writing default config {default_path:?}"))?;
        wrote_default = Some(default_path.clone());
    }

    let mut merged = read_table(&default_path)?;
    let user_path = folder.join(USER_CONFIG_FILE);
    if user_path.is_file() {
        merge(&mut merged, read_table(&user_path)?);
    }

    let config = toml::Value::Table(merged)
        .try_into()
        .with_context(|| format!("parsing config in {folder:?}"))?;
    Ok(LoadedConfig {
        config,
        wrote_default,
    })
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading config file {path:?}"))?;
    toml::from_str(&contents).with_context(|| format!("parsing config file {path:?}"))
}

/// Deep-merges `overlay` into `base`; tables merge, everything else replaces.
fn merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

impl Config {
    /// Applies `CH_BACKUP_*` environment overrides. `lookup` is usually
    /// `std::env::var(..).ok()`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let ch = &mut self.clickhouse;
        if let Some(host) = lookup("CH_BACKUP_CLICKHOUSE_HOST") {
            ch.host = Some(host);
        }
        if let Some(port) = lookup("CH_BACKUP_CLICKHOUSE_PORT") {
            ch.port = Some(
                port.parse()
                    .with_context(|| format!("CH_BACKUP_CLICKHOUSE_PORT is not a port: {port}"))?,
            );
        }
        ch.user = lookup("CH_BACKUP_CLICKHOUSE_USER").or(ch.user.take());
        ch.password = lookup("CH_BACKUP_CLICKHOUSE_PASSWORD").or(ch.password.take());

        let s3 = &mut self.backup.s3;
        s3.access_key_id = lookup("CH_BACKUP_S3_ACCESS_KEY_ID").or(s3.access_key_id.take());
        s3.secret_access_key =
            lookup("CH_BACKUP_S3_SECRET_ACCESS_KEY").or(s3.secret_access_key.take());
        Ok(())
    }
}

/// Validated runtime settings, assembled once and passed by reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub connection: ConnectionConfig,
    pub target: BackupTarget,
    /// Suffix for new chains; `None` for object storage.
    pub file_type: Option<String>,
    pub retention: RetentionPolicy,
    pub scope: Scope,
    pub poll_interval: Duration,
}

impl TryFrom<Config> for Settings {
    type Error = ConfigError;

    fn try_from(config: Config) -> Result<Self, Self::Error> {
        let Config {
            clickhouse,
            backup,
            logging: _,
        } = config;

        let defaults = ConnectionConfig::default();
        let connection = ConnectionConfig {
            host: clickhouse.host.unwrap_or(defaults.host),
            port: clickhouse.port.unwrap_or(defaults.port),
            user: clickhouse.user.unwrap_or(defaults.user),
            password: clickhouse.password.unwrap_or(defaults.password),
            secure: clickhouse.secure.unwrap_or(defaults.secure),
        };

        let target = BackupTarget::try_from(TargetParams {
            kind: backup.target.unwrap_or_else(|| "File".to_owned()),
            dir: backup.dir,
            disk: backup.disk,
            s3_endpoint: backup.s3.endpoint,
            s3_bucket: backup.s3.bucket,
            s3_path: backup.s3.path,
            s3_region: backup.s3.region,
            s3_access_key_id: backup.s3.access_key_id,
            s3_secret_access_key: backup.s3.secret_access_key,
        })?;

        let file_type = backup
            .file_type
            .map(|t| t.trim_start_matches('.').to_owned())
            .filter(|t| !t.is_empty());
        let file_type = if target.uses_object_storage() {
            if file_type.is_some() {
                warn!(target = target.label(), "file_type is ignored for object storage targets");
            }
            None
        } else {
            file_type
        };

        let scope = match backup.ignored_databases {
            Some(ignored) => Scope::all_except(ignored)?,
            None => Scope::default_all(),
        };

        Ok(Settings {
            connection,
            target,
            file_type,
            retention: RetentionPolicy {
                max_incrementals: backup
                    .max_incremental_backups
                    .unwrap_or(DEFAULT_MAX_INCREMENTALS),
                max_full_chains: backup.max_full_backups.unwrap_or(DEFAULT_MAX_FULL_CHAINS),
            },
            scope,
            poll_interval: backup
                .poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
        })
    }
}

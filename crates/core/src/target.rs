use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Object storage location and static credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub endpoint: String,
    pub bucket: String,
    /// Key prefix inside the bucket under which artifacts live.
    pub path: Option<String>,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl S3Location {
    /// Object key prefix for an artifact (without trailing slash).
    pub fn key_for(&self, artifact: &str) -> String {
        match self.prefix() {
            Some(prefix) => format!("{prefix}/{artifact}"),
            None => artifact.to_owned(),
        }
    }

    /// Configured path with surrounding slashes removed.
    pub fn prefix(&self) -> Option<&str> {
        self.path
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
    }

    fn url_for(&self, artifact: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.bucket,
            self.key_for(artifact)
        )
    }
}

/// Where the database writes backups, and how we list them afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupTarget {
    /// `File()` destination. `dir` is the server's backups directory as seen
    /// from this host.
    File { dir: PathBuf },
    /// A named ClickHouse disk whose root is mounted locally at `dir`.
    Disk { disk: String, dir: PathBuf },
    S3(S3Location),
    /// A ClickHouse disk that itself lives on object storage.
    S3Disk { disk: String, location: S3Location },
}

impl BackupTarget {
    pub fn label(&self) -> &'static str {
        match self {
            BackupTarget::File { .. } => "File",
            BackupTarget::Disk { .. } => "Disk",
            BackupTarget::S3(_) => "S3",
            BackupTarget::S3Disk { .. } => "S3-Disk",
        }
    }

    /// Renders the backup destination clause for an artifact, e.g.
    /// `File('ch-backup-20240101_0000-full.zip')`.
    ///
    /// Values are spliced verbatim; quoting is the caller's concern.
    pub fn address(&self, artifact: &str) -> String {
        match self {
            BackupTarget::File { .. } => format!("File('{artifact}')"),
            BackupTarget::Disk { disk, .. } | BackupTarget::S3Disk { disk, .. } => {
                format!("Disk('{disk}', '{artifact}')")
            }
            BackupTarget::S3(location) => format!(
                "S3('{}', '{}', '{}')",
                location.url_for(artifact),
                location.access_key_id,
                location.secret_access_key
            ),
        }
    }

    /// Object storage targets write prefixes, not files.
    pub fn uses_object_storage(&self) -> bool {
        matches!(self, BackupTarget::S3(_) | BackupTarget::S3Disk { .. })
    }
}

/// Loosely typed target parameters as they come out of configuration.
#[derive(Debug, Clone, Default)]
pub struct TargetParams {
    pub kind: String,
    pub dir: Option<PathBuf>,
    pub disk: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_path: Option<String>,
    pub s3_region: Option<String>,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
}

pub const DEFAULT_S3_REGION: &str = "us-east-1";

impl TryFrom<TargetParams> for BackupTarget {
    type Error = ConfigError;

    fn try_from(params: TargetParams) -> Result<Self, Self::Error> {
        match params.kind.as_str() {
            "File" => {
                let dir = require("File", "backup.dir", params.dir)?;
                ensure_dir(&dir)?;
                Ok(BackupTarget::File { dir })
            }
            "Disk" => {
                let disk = require("Disk", "backup.disk", params.disk)?;
                let dir = require("Disk", "backup.dir", params.dir)?;
                ensure_dir(&dir)?;
                Ok(BackupTarget::Disk { disk, dir })
            }
            "S3" => Ok(BackupTarget::S3(s3_location("S3", params)?)),
            "S3-Disk" => {
                let disk = require("S3-Disk", "backup.disk", params.disk.clone())?;
                let location = s3_location("S3-Disk", params)?;
                Ok(BackupTarget::S3Disk { disk, location })
            }
            other => Err(ConfigError::UnknownTarget(other.to_owned())),
        }
    }
}

fn s3_location(target: &'static str, params: TargetParams) -> Result<S3Location, ConfigError> {
    Ok(S3Location {
        endpoint: require(target, "backup.s3.endpoint", params.s3_endpoint)?,
        bucket: require(target, "backup.s3.bucket", params.s3_bucket)?,
        access_key_id: require(target, "backup.s3.access_key_id", params.s3_access_key_id)?,
        secret_access_key: require(
            target,
            "backup.s3.secret_access_key",
            params.s3_secret_access_key,
        )?,
        path: params.s3_path,
        region: params
            .s3_region
            .unwrap_or_else(|| DEFAULT_S3_REGION.to_owned()),
    })
}

fn require<T: IsBlank>(
    target: &'static str,
    param: &'static str,
    value: Option<T>,
) -> Result<T, ConfigError> {
    value
        .filter(|v| !v.is_blank())
        .ok_or(ConfigError::MissingParameter { target, param })
}

fn ensure_dir(dir: &Path) -> Result<(), ConfigError> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(ConfigError::MissingBackupDir(dir.to_path_buf()))
    }
}

trait IsBlank {
    fn is_blank(&self) -> bool;
}

impl IsBlank for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl IsBlank for PathBuf {
    fn is_blank(&self) -> bool {
        self.as_os_str().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(path: Option<&str>) -> S3Location {
        S3Location {
            endpoint: "https://s3.example.com/".to_owned(),
            bucket: "backups".to_owned(),
            path: path.map(str::to_owned),
            region: DEFAULT_S3_REGION.to_owned(),
            access_key_id: "AKID".to_owned(),
            secret_access_key: "SECRET".to_owned(),
        }
    }

    #[test]
    fn renders_each_target_kind() {
        let name = "ch-backup-20240101_0000-full";
        let file = BackupTarget::File {
            dir: PathBuf::from("/backups"),
        };
        assert_eq!(file.address(name), format!("File('{name}')"));

        let disk = BackupTarget::Disk {
            disk: "backups".to_owned(),
            dir: PathBuf::from("/backups"),
        };
        assert_eq!(disk.address(name), format!("Disk('backups', '{name}')"));

        let s3 = BackupTarget::S3(location(Some("/clickhouse/")));
        assert_eq!(
            s3.address(name),
            format!("S3('https://s3.example.com/backups/clickhouse/{name}', 'AKID', 'SECRET')")
        );

        let s3_disk = BackupTarget::S3Disk {
            disk: "s3_plain".to_owned(),
            location: location(None),
        };
        assert_eq!(s3_disk.address(name), format!("Disk('s3_plain', '{name}')"));
        assert!(s3_disk.uses_object_storage());
    }

    #[test]
    fn file_target_requires_existing_dir() {
        let err = BackupTarget::try_from(TargetParams {
            kind: "File".to_owned(),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingParameter {
                target: "File",
                param: "backup.dir"
            }
        );

        let tmp = tempfile::tempdir().expect("tempdir");
        let missing = tmp.path().join("nope");
        let err = BackupTarget::try_from(TargetParams {
            kind: "File".to_owned(),
            dir: Some(missing.clone()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::MissingBackupDir(missing));

        let ok = BackupTarget::try_from(TargetParams {
            kind: "File".to_owned(),
            dir: Some(tmp.path().to_path_buf()),
            ..Default::default()
        })
        .expect("valid");
        assert_eq!(
            ok,
            BackupTarget::File {
                dir: tmp.path().to_path_buf()
            }
        );
    }

    #[test]
    fn s3_target_requires_credentials() {
        let err = BackupTarget::try_from(TargetParams {
            kind: "S3".to_owned(),
            s3_endpoint: Some("https://s3.example.com".to_owned()),
            s3_bucket: Some("b".to_owned()),
            s3_access_key_id: Some("  ".to_owned()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingParameter {
                target: "S3",
                param: "backup.s3.access_key_id"
            }
        );
    }

    #[test]
    fn unknown_target_is_rejected() {
        let err = BackupTarget::try_from(TargetParams {
            kind: "Tape".to_owned(),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::UnknownTarget("Tape".to_owned()));
    }
}

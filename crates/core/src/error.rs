use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("not a backup artifact name: {0}")]
    Invalid(String),
}

/// Invalid or incomplete configuration. Always raised before the database
/// is contacted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown backup target {0:?} (expected File, Disk, S3 or S3-Disk)")]
    UnknownTarget(String),
    #[error("{param} must be provided when using the {target} backup target")]
    MissingParameter {
        target: &'static str,
        param: &'static str,
    },
    #[error("backup dir {} does not exist", .0.display())]
    MissingBackupDir(PathBuf),
    #[error("ignored_databases must contain at least one database, e.g. system")]
    EmptyIgnoredDatabases,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("backup {name} already exists; refusing to overwrite it within the same minute")]
    Collision { name: String },
}

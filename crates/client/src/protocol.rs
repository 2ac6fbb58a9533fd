//! Asynchronous BACKUP submission and completion polling.
//!
//! A backup is submitted with `ASYNC`, which makes ClickHouse return
//! `(id, status)` immediately. The id is then polled in `system.backups`
//! until the status leaves `CREATING_BACKUP`.

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{Database, DatabaseError, Row};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

const STATUS_QUERY: &str = "SELECT name, status, error FROM system.backups WHERE id = {id:String}";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackupId(pub String);

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupStatus {
    CreatingBackup,
    BackupCreated,
    /// Any other value reported by the server, e.g. `BACKUP_FAILED`.
    Other(String),
}

impl BackupStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "CREATING_BACKUP" => BackupStatus::CreatingBackup,
            "BACKUP_CREATED" => BackupStatus::BackupCreated,
            other => BackupStatus::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupStatus::CreatingBackup => f.write_str("CREATING_BACKUP"),
            BackupStatus::BackupCreated => f.write_str("BACKUP_CREATED"),
            BackupStatus::Other(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("backup {id} was rejected with status {status}; check the clickhouse logs or system.backups")]
    SubmissionRejected { id: BackupId, status: BackupStatus },
    #[error("backup {id} not found in system.backups")]
    StatusMissing { id: BackupId },
    #[error("backup {id} failed with status {status}: {error}")]
    BackupFailed {
        id: BackupId,
        status: BackupStatus,
        error: String,
    },
    #[error("unexpected result shape: {0}")]
    UnexpectedRow(String),
}

/// Final state of a successfully created backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedBackup {
    pub id: BackupId,
    pub name: String,
}

/// Submits BACKUP statements and waits for them to finish.
pub struct BackupRunner<'a> {
    db: &'a dyn Database,
    poll_interval: Duration,
}

impl<'a> BackupRunner<'a> {
    pub fn new(db: &'a dyn Database) -> Self {
        Self {
            db,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Runs a BACKUP statement to completion.
    ///
    /// There is no timeout: this waits as long as the server keeps reporting
    /// `CREATING_BACKUP`.
    pub async fn run(&self, statement: &str) -> Result<CreatedBackup, ProtocolError> {
        let id = self.submit(statement).await?;
        loop {
            let (name, status, error) = self.status(&id).await?;
            match status {
                BackupStatus::CreatingBackup => {
                    debug!(backup_id = %id, interval = ?self.poll_interval, "still creating the backup");
                    tokio::time::sleep(self.poll_interval).await;
                }
                BackupStatus::BackupCreated => {
                    info!(backup_id = %id, %name, "backup has been created");
                    return Ok(CreatedBackup { id, name });
                }
                status => {
                    error!(backup_id = %id, %status, %error, "failed to create backup");
                    return Err(ProtocolError::BackupFailed { id, status, error });
                }
            }
        }
    }

    async fn submit(&self, statement: &str) -> Result<BackupId, ProtocolError> {
        let rows = self.db.execute(&format!("{statement} ASYNC"), &[]).await?;
        let row = single_row(rows, 2)?;
        let id = BackupId(text(&row[0]));
        let status = BackupStatus::parse(&text(&row[1]));
        info!(backup_id = %id, %status, "backup submitted");

        if status != BackupStatus::CreatingBackup {
            return Err(ProtocolError::SubmissionRejected { id, status });
        }
        Ok(id)
    }

    /// Current `(name, status, error)` of a submitted backup.
    pub async fn status(&self, id: &BackupId) -> Result<(String, BackupStatus, String), ProtocolError> {
        let rows = self.db.execute(STATUS_QUERY, &[("id", id.0.as_str())]).await?;
        if rows.is_empty() {
            return Err(ProtocolError::StatusMissing { id: id.clone() });
        }
        let row = single_row(rows, 3)?;
        Ok((text(&row[0]), BackupStatus::parse(&text(&row[1])), text(&row[2])))
    }
}

fn single_row(rows: Vec<Row>, arity: usize) -> Result<Row, ProtocolError> {
    let count = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), count) {
        (Some(row), 1) if row.len() >= arity => Ok(row),
        (Some(row), 1) => Err(ProtocolError::UnexpectedRow(format!(
            "expected {arity} columns, got {}",
            row.len()
        ))),
        _ => Err(ProtocolError::UnexpectedRow(format!("expected one row, got {count}"))),
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub mod http;
pub mod protocol;

use serde_json::Value;
use thiserror::Error;

pub use http::{ConnectionConfig, HttpDatabase};
pub use protocol::{
    BackupId, BackupRunner, BackupStatus, CreatedBackup, ProtocolError, DEFAULT_POLL_INTERVAL,
};

/// One result row; columns in SELECT order.
pub type Row = Vec<Value>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("request to clickhouse failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("clickhouse returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response from clickhouse: {0}")]
    Decode(String),
}

/// The only database capability this tool needs: run a statement, get rows.
#[async_trait::async_trait]
pub trait Database: Send + Sync {
    /// `params` bind `{name:Type}` placeholders in the statement.
    async fn execute(&self, statement: &str, params: &[(&str, &str)]) -> Result<Vec<Row>, DatabaseError>;
}

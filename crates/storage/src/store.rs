use anyhow::Result;

/// Raw listing and deletion of backup artifacts, implemented per target kind.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Names of all entries at the top level of the backup location. May
    /// include entries that are not backups.
    async fn list(&self) -> Result<Vec<String>>;

    /// Remove one artifact. Missing artifacts are reported as errors.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Human readable location for log messages.
    fn describe(&self) -> String;
}

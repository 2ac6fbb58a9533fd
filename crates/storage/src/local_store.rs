use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;

use crate::store::ArtifactStore;

/// Backups on a locally mounted directory (File and Disk targets).
///
/// Archives are plain files; unsuffixed backups are directories.
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait::async_trait]
impl ArtifactStore for LocalStore {
    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("read backup dir {}", self.dir.display()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("read entry in {}", self.dir.display()))?
        {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let path = self.dir.join(name);
        let meta = fs::symlink_metadata(&path)
            .await
            .with_context(|| format!("stat {}", path.display()))?;
        let removed = if meta.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };
        removed.with_context(|| format!("delete {}", path.display()))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

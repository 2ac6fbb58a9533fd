pub mod local_store;
mod repository;
pub mod s3_store;
pub mod store;

pub use repository::{BackupRepository, EvictionReport};
pub use store::ArtifactStore;

pub mod backup;
pub mod chain;
pub mod error;
pub mod naming;
pub mod policy;
pub mod statement;
pub mod target;

pub use backup::{Artifact, BackupKind, FullBackup, IncrementalBackup, NewBackup, Timestamp};
pub use chain::{ChainEntry, ChainMap, Reconstruction};
pub use error::{ConfigError, NamingError, PlanError};
pub use naming::{ArtifactId, ArtifactName};
pub use policy::{plan_next, select_base, select_evictions, BackupPlan, RetentionPolicy};
pub use statement::{Operation, Scope, Statement};
pub use target::{BackupTarget, S3Location, TargetParams};

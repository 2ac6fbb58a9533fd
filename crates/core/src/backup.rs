use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::naming::{ArtifactId, ArtifactName};

/// Identity of a backup: a UTC instant at minute resolution.
///
/// Artifact names only carry minutes, so anything finer is dropped at
/// construction. A freshly created backup and the same backup decoded from
/// its name therefore compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self::from_naive(at.naive_utc())
    }

    pub fn from_naive(at: NaiveDateTime) -> Self {
        let truncated = at
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(at);
        Self(truncated)
    }

    /// Builds a timestamp from calendar fields, `None` if they are out of range.
    pub fn from_ymd_hm(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .map(Self)
    }

    /// Human readable form used in listings, e.g. `2024-03-01 02:30`.
    pub fn display_long(&self) -> String {
        self.0.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// Renders the compact `YYYYMMDD_HHMM` form used inside artifact names.
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d_%H%M"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    Full,
    Incremental,
}

impl BackupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupKind::Full => "full",
            BackupKind::Incremental => "inc",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that lives in the backup target under a conventional name.
pub trait Artifact {
    fn timestamp(&self) -> Timestamp;

    fn kind(&self) -> BackupKind;

    /// Exact artifact name as stored by the backend.
    fn name(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementalBackup {
    base: Timestamp,
    timestamp: Timestamp,
    file_type: Option<String>,
}

impl IncrementalBackup {
    pub fn new(base: Timestamp, timestamp: Timestamp, file_type: Option<String>) -> Self {
        Self {
            base,
            timestamp,
            file_type,
        }
    }

    /// Key of the owning full backup in the chain map.
    pub fn base(&self) -> Timestamp {
        self.base
    }

    pub fn file_type(&self) -> Option<&str> {
        self.file_type.as_deref()
    }
}

impl Artifact for IncrementalBackup {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn kind(&self) -> BackupKind {
        BackupKind::Incremental
    }

    fn name(&self) -> String {
        ArtifactName {
            id: ArtifactId::Incremental {
                base: self.base,
                timestamp: self.timestamp,
            },
            suffix: self.file_type.clone(),
        }
        .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullBackup {
    timestamp: Timestamp,
    file_type: Option<String>,
    incrementals: Vec<IncrementalBackup>,
}

impl FullBackup {
    pub fn new(timestamp: Timestamp, file_type: Option<String>) -> Self {
        Self {
            timestamp,
            file_type,
            incrementals: Vec::new(),
        }
    }

    pub fn file_type(&self) -> Option<&str> {
        self.file_type.as_deref()
    }

    /// Incrementals in ascending timestamp order once the chain is sorted.
    pub fn incrementals(&self) -> &[IncrementalBackup] {
        &self.incrementals
    }

    /// Describes the next incremental on top of this backup without attaching it.
    /// The chain only grows once the database reports success.
    pub fn next_incremental(&self, timestamp: Timestamp) -> IncrementalBackup {
        IncrementalBackup::new(self.timestamp, timestamp, self.file_type.clone())
    }

    pub fn has_incremental_at(&self, timestamp: Timestamp) -> bool {
        self.incrementals.iter().any(|i| i.timestamp == timestamp)
    }

    pub(crate) fn push_incremental(&mut self, incremental: IncrementalBackup) {
        self.incrementals.push(incremental);
    }

    pub(crate) fn sort_incrementals(&mut self) {
        self.incrementals.sort_by_key(|i| i.timestamp);
    }

    /// Names to delete when evicting this chain, incrementals first.
    pub fn deletion_order(&self) -> Vec<String> {
        self.incrementals
            .iter()
            .map(Artifact::name)
            .chain(std::iter::once(self.name()))
            .collect()
    }
}

impl Artifact for FullBackup {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn kind(&self) -> BackupKind {
        BackupKind::Full
    }

    fn name(&self) -> String {
        ArtifactName {
            id: ArtifactId::Full {
                base: self.timestamp,
            },
            suffix: self.file_type.clone(),
        }
        .to_string()
    }
}

/// A backup about to be created: either a new chain or the next link of one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewBackup {
    Full(FullBackup),
    Incremental(IncrementalBackup),
}

impl NewBackup {
    pub fn kind(&self) -> BackupKind {
        match self {
            NewBackup::Full(_) => BackupKind::Full,
            NewBackup::Incremental(_) => BackupKind::Incremental,
        }
    }

    pub fn name(&self) -> String {
        match self {
            NewBackup::Full(full) => full.name(),
            NewBackup::Incremental(inc) => inc.name(),
        }
    }
}

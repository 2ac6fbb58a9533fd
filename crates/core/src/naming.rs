//! Artifact naming convention.
//!
//! `ch-backup-<base>-full[.<suffix>]` and
//! `ch-backup-<base>-inc-<inc>[.<suffix>]`, timestamps as `YYYYMMDD_HHMM`.

use std::fmt;
use std::str::FromStr;

use crate::backup::{BackupKind, Timestamp};
use crate::error::NamingError;

pub const NAME_PREFIX: &str = "ch-backup-";

const TIMESTAMP_LEN: usize = 13;

/// Logical identity encoded in an artifact name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactId {
    Full { base: Timestamp },
    Incremental { base: Timestamp, timestamp: Timestamp },
}

impl ArtifactId {
    pub fn kind(&self) -> BackupKind {
        match self {
            ArtifactId::Full { .. } => BackupKind::Full,
            ArtifactId::Incremental { .. } => BackupKind::Incremental,
        }
    }

    pub fn base(&self) -> Timestamp {
        match self {
            ArtifactId::Full { base } | ArtifactId::Incremental { base, .. } => *base,
        }
    }

    pub fn incremental(&self) -> Option<Timestamp> {
        match self {
            ArtifactId::Full { .. } => None,
            ArtifactId::Incremental { timestamp, .. } => Some(*timestamp),
        }
    }
}

/// A decoded artifact name. `Display` and `FromStr` are exact inverses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub id: ArtifactId,
    pub suffix: Option<String>,
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            ArtifactId::Full { base } => write!(f, "{NAME_PREFIX}{base}-full")?,
            ArtifactId::Incremental { base, timestamp } => {
                write!(f, "{NAME_PREFIX}{base}-inc-{timestamp}")?
            }
        }
        if let Some(suffix) = &self.suffix {
            write!(f, ".{suffix}")?;
        }
        Ok(())
    }
}

impl FromStr for ArtifactName {
    type Err = NamingError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        decode(name)
    }
}

pub fn encode(id: ArtifactId, suffix: Option<&str>) -> String {
    ArtifactName {
        id,
        suffix: suffix.map(str::to_owned),
    }
    .to_string()
}

pub fn decode(name: &str) -> Result<ArtifactName, NamingError> {
    let invalid = || NamingError::Invalid(name.to_owned());

    let rest = name.strip_prefix(NAME_PREFIX).ok_or_else(invalid)?;
    let (stem, suffix) = match rest.split_once('.') {
        Some((_, "")) => return Err(invalid()),
        Some((stem, suffix)) => (stem, Some(suffix.to_owned())),
        None => (rest, None),
    };

    let (base, tail) = split_timestamp(stem).ok_or_else(invalid)?;
    let id = match tail.strip_prefix('-').ok_or_else(invalid)? {
        "full" => ArtifactId::Full { base },
        other => {
            let inc = other.strip_prefix("inc-").ok_or_else(invalid)?;
            match split_timestamp(inc) {
                Some((timestamp, "")) => ArtifactId::Incremental { base, timestamp },
                _ => return Err(invalid()),
            }
        }
    };

    Ok(ArtifactName { id, suffix })
}

/// Parses a leading `YYYYMMDD_HHMM` and returns it with the remainder.
fn split_timestamp(s: &str) -> Option<(Timestamp, &str)> {
    let raw = s.get(..TIMESTAMP_LEN)?;
    let bytes = raw.as_bytes();
    let well_formed = bytes.iter().enumerate().all(|(i, b)| {
        if i == 8 {
            *b == b'_'
        } else {
            b.is_ascii_digit()
        }
    });
    if !well_formed {
        return None;
    }

    let field = |range: std::ops::Range<usize>| raw[range].parse::<u32>().ok();
    let year = raw[0..4].parse::<i32>().ok()?;
    let timestamp =
        Timestamp::from_ymd_hm(year, field(4..6)?, field(6..8)?, field(9..11)?, field(11..13)?)?;
    Some((timestamp, &s[TIMESTAMP_LEN..]))
}

/// True for listing entries that plausibly were meant to be artifacts:
/// anything with the naming prefix, or an archive file.
pub fn looks_like_artifact(name: &str) -> bool {
    name.starts_with(NAME_PREFIX) || name.ends_with(".zip") || name.contains(".tar")
}

use std::collections::btree_map::{self, BTreeMap};

use tracing::{debug, error, warn};

use crate::backup::{Artifact, FullBackup, IncrementalBackup, NewBackup, Timestamp};
use crate::naming::{self, ArtifactId, ArtifactName};

/// All known chains keyed by the full backup's timestamp, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainMap {
    chains: BTreeMap<Timestamp, FullBackup>,
}

/// Result of rebuilding the chain map from a storage listing.
#[derive(Debug, Default)]
pub struct Reconstruction {
    pub chains: ChainMap,
    /// Incrementals whose base is missing. They can never be restored and
    /// should be removed from storage.
    pub orphans: Vec<String>,
}

impl ChainMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds chains from artifact names in any order.
    ///
    /// Full backups are attached before incrementals so a base is always
    /// present when its incrementals are seen. Unparseable names are skipped.
    pub fn reconstruct<I, S>(names: I) -> Reconstruction
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed: Vec<(String, ArtifactName)> = Vec::new();
        for name in names {
            let name = name.as_ref();
            match naming::decode(name) {
                Ok(artifact) => parsed.push((name.to_owned(), artifact)),
                Err(e) if naming::looks_like_artifact(name) => {
                    warn!(artifact = name, error = %e, "invalid file name in backup target")
                }
                Err(_) => debug!(entry = name, "skipping non-backup entry"),
            }
        }
        // Stable: fulls first, listing order otherwise preserved.
        parsed.sort_by_key(|(_, artifact)| artifact.id.incremental().is_some());

        let mut out = Reconstruction::default();
        for (name, artifact) in parsed {
            match artifact.id {
                ArtifactId::Full { base } => match out.chains.chains.entry(base) {
                    btree_map::Entry::Vacant(slot) => {
                        slot.insert(FullBackup::new(base, artifact.suffix));
                    }
                    btree_map::Entry::Occupied(_) => {
                        warn!(artifact = %name, "duplicate full backup timestamp, ignoring");
                    }
                },
                ArtifactId::Incremental { base, timestamp } => {
                    let Some(full) = out.chains.chains.get_mut(&base) else {
                        error!(artifact = %name, base = %base, "full base backup is missing");
                        out.orphans.push(name);
                        continue;
                    };
                    if full.has_incremental_at(timestamp) {
                        warn!(artifact = %name, "duplicate incremental backup timestamp, ignoring");
                        continue;
                    }
                    full.push_incremental(IncrementalBackup::new(base, timestamp, artifact.suffix));
                }
            }
        }

        for full in out.chains.chains.values_mut() {
            full.sort_incrementals();
        }
        out
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn get(&self, timestamp: &Timestamp) -> Option<&FullBackup> {
        self.chains.get(timestamp)
    }

    pub fn newest(&self) -> Option<&FullBackup> {
        self.chains.values().next_back()
    }

    /// Chains in ascending timestamp order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &FullBackup> {
        self.chains.values()
    }

    /// Looks up any artifact by its exact name.
    pub fn find(&self, name: &str) -> Option<ChainEntry<'_>> {
        self.iter().find_map(|full| {
            if full.name() == name {
                return Some(ChainEntry::Full(full));
            }
            full.incrementals()
                .iter()
                .find(|inc| inc.name() == name)
                .map(|inc| ChainEntry::Incremental { base: full, incremental: inc })
        })
    }

    /// Records a backup the database has finished creating.
    pub fn record(&mut self, backup: NewBackup) {
        match backup {
            NewBackup::Full(full) => {
                self.chains.insert(full.timestamp(), full);
            }
            NewBackup::Incremental(inc) => match self.chains.get_mut(&inc.base()) {
                Some(full) => {
                    full.push_incremental(inc);
                    full.sort_incrementals();
                }
                None => warn!(artifact = %inc.name(), "base of new incremental vanished"),
            },
        }
    }

    pub fn remove(&mut self, timestamp: &Timestamp) -> Option<FullBackup> {
        self.chains.remove(timestamp)
    }
}

/// An artifact found in the chain map together with the chain it belongs to.
#[derive(Debug, Clone, Copy)]
pub enum ChainEntry<'a> {
    Full(&'a FullBackup),
    Incremental {
        base: &'a FullBackup,
        incremental: &'a IncrementalBackup,
    },
}

impl ChainEntry<'_> {
    pub fn name(&self) -> String {
        match self {
            ChainEntry::Full(full) => full.name(),
            ChainEntry::Incremental { incremental, .. } => incremental.name(),
        }
    }

    /// Base to declare when restoring, if any.
    pub fn base(&self) -> Option<&FullBackup> {
        match self {
            ChainEntry::Full(_) => None,
            ChainEntry::Incremental { base, .. } => Some(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupKind;

    fn ts(day: u32, hour: u32) -> Timestamp {
        Timestamp::from_ymd_hm(2024, 2, day, hour, 0).expect("valid timestamp")
    }

    #[test]
    fn empty_listing_is_cold_start() {
        let out = ChainMap::reconstruct(Vec::<String>::new());
        assert!(out.chains.is_empty());
        assert!(out.orphans.is_empty());
    }

    #[test]
    fn incrementals_attach_regardless_of_listing_order() {
        let names = [
            "ch-backup-20240201_0000-inc-20240204_0000.zip",
            "ch-backup-20240201_0000-inc-20240202_0000.zip",
            "ch-backup-20240201_0000-full.zip",
            "ch-backup-20240201_0000-inc-20240203_0000.zip",
        ];
        let out = ChainMap::reconstruct(names);
        assert_eq!(out.chains.len(), 1);
        assert!(out.orphans.is_empty());

        let chain = out.chains.newest().expect("one chain");
        let order: Vec<_> = chain.incrementals().iter().map(|i| i.timestamp()).collect();
        assert_eq!(order, vec![ts(2, 0), ts(3, 0), ts(4, 0)]);
    }

    #[test]
    fn orphaned_incremental_is_reported_once() {
        let names = [
            "ch-backup-20240201_0000-full.zip",
            "ch-backup-20240205_0000-inc-20240206_0000.zip",
        ];
        let out = ChainMap::reconstruct(names);
        assert_eq!(out.chains.len(), 1);
        assert_eq!(out.orphans, vec!["ch-backup-20240205_0000-inc-20240206_0000.zip"]);
        assert!(out.chains.newest().expect("chain").incrementals().is_empty());
    }

    #[test]
    fn unrelated_entries_are_skipped() {
        let out = ChainMap::reconstruct(["lost+found", "notes.tar.gz", "ch-backup-20240201_0000-full"]);
        assert_eq!(out.chains.len(), 1);
        assert!(out.orphans.is_empty());
    }

    #[test]
    fn duplicate_full_keeps_first() {
        let out = ChainMap::reconstruct([
            "ch-backup-20240201_0000-full.zip",
            "ch-backup-20240201_0000-full.tar.gz",
        ]);
        assert_eq!(out.chains.len(), 1);
        assert_eq!(out.chains.newest().expect("chain").file_type(), Some("zip"));
    }

    #[test]
    fn find_resolves_base_for_incremental() {
        let out = ChainMap::reconstruct([
            "ch-backup-20240201_0000-full",
            "ch-backup-20240201_0000-inc-20240202_0000",
        ]);
        let entry = out
            .chains
            .find("ch-backup-20240201_0000-inc-20240202_0000")
            .expect("found");
        assert_eq!(entry.base().map(|b| b.timestamp()), Some(ts(1, 0)));
        assert!(out.chains.find("ch-backup-20240301_0000-full").is_none());
    }

    #[test]
    fn record_adds_new_chain_and_links() {
        let mut chains = ChainMap::new();
        let full = FullBackup::new(ts(1, 0), None);
        let inc = full.next_incremental(ts(1, 6));
        chains.record(NewBackup::Full(full));
        chains.record(NewBackup::Incremental(inc));

        let newest = chains.newest().expect("chain");
        assert_eq!(newest.kind(), BackupKind::Full);
        assert_eq!(newest.incrementals().len(), 1);
        assert!(chains.find("ch-backup-20240201_0000-inc-20240201_0600").is_some());
    }
}

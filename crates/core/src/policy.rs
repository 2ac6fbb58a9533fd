use crate::backup::{Artifact, BackupKind, FullBackup, NewBackup, Timestamp};
use crate::chain::ChainMap;
use crate::error::PlanError;

pub const DEFAULT_MAX_INCREMENTALS: usize = 6;
pub const DEFAULT_MAX_FULL_CHAINS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Incrementals allowed on top of one full backup.
    pub max_incrementals: usize,
    /// Chains to keep. Zero keeps everything.
    pub max_full_chains: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_incrementals: DEFAULT_MAX_INCREMENTALS,
            max_full_chains: DEFAULT_MAX_FULL_CHAINS,
        }
    }
}

/// Picks the chain the next backup should extend, or `None` when a new full
/// backup is due.
pub fn select_base(chains: &ChainMap, max_incrementals: usize) -> Option<&FullBackup> {
    chains
        .newest()
        .filter(|newest| newest.incrementals().len() < max_incrementals)
}

/// Chains to delete, oldest first.
///
/// Old chains are trimmed down to the limit. A full backup about to start
/// another chain counts against the limit too, so with `next == Full` one
/// slot less is kept. A lone chain is never evicted.
pub fn select_evictions(
    chains: &ChainMap,
    max_full_chains: usize,
    next: BackupKind,
) -> Vec<Timestamp> {
    let existing = chains.len();
    if max_full_chains == 0 || existing <= 1 {
        return Vec::new();
    }

    let keep = match next {
        BackupKind::Full => max_full_chains - 1,
        BackupKind::Incremental => max_full_chains,
    };

    chains
        .iter()
        .take(existing.saturating_sub(keep))
        .map(|full| full.timestamp())
        .collect()
}

/// What the next run should create and what it should clean up afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPlan {
    pub backup: NewBackup,
    /// Base of an incremental backup; `None` for a new chain.
    pub base: Option<FullBackup>,
    pub evictions: Vec<Timestamp>,
}

/// Decides the next backup.
///
/// `file_type` is the artifact suffix for new chains; incrementals inherit the
/// suffix of their base. A planned name that already exists is rejected rather
/// than overwritten.
pub fn plan_next(
    chains: &ChainMap,
    policy: &RetentionPolicy,
    force_full: bool,
    file_type: Option<&str>,
    now: Timestamp,
) -> Result<BackupPlan, PlanError> {
    let base = if force_full {
        None
    } else {
        select_base(chains, policy.max_incrementals)
    };

    let backup = match base {
        Some(full) => NewBackup::Incremental(full.next_incremental(now)),
        None => NewBackup::Full(FullBackup::new(now, file_type.map(str::to_owned))),
    };

    let collides = match &backup {
        NewBackup::Full(full) => chains.get(&full.timestamp()).is_some(),
        NewBackup::Incremental(inc) => base.is_some_and(|b| b.has_incremental_at(inc.timestamp())),
    };
    if collides {
        return Err(PlanError::Collision {
            name: backup.name(),
        });
    }

    let evictions = select_evictions(chains, policy.max_full_chains, backup.kind());
    Ok(BackupPlan {
        backup,
        base: base.cloned(),
        evictions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(day: u32) -> Timestamp {
        Timestamp::from_ymd_hm(2024, 4, day, 3, 0).expect("valid timestamp")
    }

    fn chains_at(days: &[u32]) -> ChainMap {
        let names: Vec<String> = days.iter().map(|d| FullBackup::new(ts(*d), None).name()).collect();
        ChainMap::reconstruct(names).chains
    }

    fn with_incrementals(base: u32, count: u32) -> ChainMap {
        let full = FullBackup::new(ts(base), None);
        let mut names = vec![full.name()];
        for i in 1..=count {
            names.push(full.next_incremental(ts(base + i)).name());
        }
        ChainMap::reconstruct(names).chains
    }

    #[test]
    fn empty_map_forces_full() {
        let chains = ChainMap::new();
        assert!(select_base(&chains, 0).is_none());
        assert!(select_base(&chains, 100).is_none());
    }

    #[test]
    fn base_is_newest_while_below_limit() {
        let mut chains = chains_at(&[1]);
        let newer = with_incrementals(10, 2);
        for full in newer.iter() {
            chains.record(NewBackup::Full(full.clone()));
        }
        assert_eq!(select_base(&chains, 3).map(|b| b.timestamp()), Some(ts(10)));
        assert!(select_base(&chains, 2).is_none());
    }

    #[test]
    fn zero_limit_never_evicts() {
        let chains = chains_at(&[1, 2, 3, 4, 5]);
        assert!(select_evictions(&chains, 0, BackupKind::Full).is_empty());
        assert!(select_evictions(&chains, 0, BackupKind::Incremental).is_empty());
    }

    #[test]
    fn single_chain_is_never_evicted() {
        let chains = chains_at(&[1]);
        assert!(select_evictions(&chains, 1, BackupKind::Full).is_empty());
    }

    #[test]
    fn at_limit_full_evicts_oldest_only() {
        let chains = chains_at(&[1, 2]);
        assert_eq!(select_evictions(&chains, 2, BackupKind::Full), vec![ts(1)]);
        assert!(select_evictions(&chains, 2, BackupKind::Incremental).is_empty());
    }

    #[test]
    fn over_limit_full_leaves_room_for_new_chain() {
        let chains = chains_at(&[1, 2, 3]);
        assert_eq!(select_evictions(&chains, 2, BackupKind::Full), vec![ts(1), ts(2)]);

        let chains = chains_at(&[1, 2, 3, 4, 5]);
        assert_eq!(
            select_evictions(&chains, 2, BackupKind::Full),
            vec![ts(1), ts(2), ts(3), ts(4)]
        );
    }

    #[test]
    fn over_limit_incremental_trims_to_limit() {
        let chains = chains_at(&[1, 2, 3]);
        assert_eq!(select_evictions(&chains, 2, BackupKind::Incremental), vec![ts(1)]);

        let chains = chains_at(&[1, 2, 3, 4, 5]);
        assert_eq!(
            select_evictions(&chains, 2, BackupKind::Incremental),
            vec![ts(1), ts(2), ts(3)]
        );
    }

    #[test]
    fn chain_count_after_run_never_exceeds_limit() {
        for existing in 2..6u32 {
            let days: Vec<u32> = (1..=existing).collect();
            let chains = chains_at(&days);
            for (next, added) in [(BackupKind::Full, 1), (BackupKind::Incremental, 0)] {
                let evicted = select_evictions(&chains, 2, next).len();
                assert_eq!(chains.len() - evicted + added, 2, "{existing} chains, next {next}");
            }
        }
    }

    #[test]
    fn limit_of_one_replaces_old_chains() {
        let chains = chains_at(&[1, 2]);
        assert_eq!(select_evictions(&chains, 1, BackupKind::Full), vec![ts(1), ts(2)]);
        assert_eq!(select_evictions(&chains, 1, BackupKind::Incremental), vec![ts(1)]);
    }

    #[test]
    fn cold_start_plans_fresh_full() {
        let plan = plan_next(&ChainMap::new(), &RetentionPolicy::default(), false, Some("zip"), ts(1))
            .expect("plan");
        assert_eq!(plan.backup.kind(), BackupKind::Full);
        assert_eq!(plan.backup.name(), "ch-backup-20240401_0300-full.zip");
        assert!(plan.base.is_none());
        assert!(plan.evictions.is_empty());
    }

    #[test]
    fn plans_incremental_inheriting_suffix() {
        let chains = ChainMap::reconstruct(["ch-backup-20240401_0300-full.tar.gz"]).chains;
        let plan = plan_next(&chains, &RetentionPolicy::default(), false, Some("zip"), ts(2))
            .expect("plan");
        assert_eq!(
            plan.backup.name(),
            "ch-backup-20240401_0300-inc-20240402_0300.tar.gz"
        );
        assert_eq!(plan.base.map(|b| b.timestamp()), Some(ts(1)));
    }

    #[test]
    fn force_full_ignores_open_chain() {
        let chains = chains_at(&[1, 2]);
        let plan = plan_next(&chains, &RetentionPolicy::default(), true, None, ts(3)).expect("plan");
        assert_eq!(plan.backup.kind(), BackupKind::Full);
        assert_eq!(plan.evictions, vec![ts(1)]);
    }

    #[test]
    fn same_minute_full_is_rejected() {
        let chains = chains_at(&[1]);
        let err = plan_next(&chains, &RetentionPolicy::default(), true, None, ts(1)).unwrap_err();
        assert!(matches!(err, PlanError::Collision { .. }));
    }

    #[test]
    fn same_minute_incremental_is_rejected() {
        let chains = with_incrementals(1, 1);
        let err = plan_next(&chains, &RetentionPolicy::default(), false, None, ts(2)).unwrap_err();
        assert_eq!(
            err,
            PlanError::Collision {
                name: "ch-backup-20240401_0300-inc-20240402_0300".to_owned()
            }
        );
    }
}

//! Membership cache
//!
//! Local replica of one authority's directory. Readers always observe either
//! the snapshot before a sync or the one after it: a full sync swaps the
//! whole map under one write lock and a pushed delta replaces one entry.
//! Entries are never edited in place.

use bnms_core::effects::PhysicalTime;
use bnms_core::{Directory, MembershipRecord, Party};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A cached record and when it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    /// Record as received
    pub record: MembershipRecord,
    /// Time of the sync or push that delivered it
    pub obtained_at: PhysicalTime,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: BTreeMap<Party, CachedEntry>,
    last_full_sync_at: Option<PhysicalTime>,
}

/// Cached directory of a single authority.
#[derive(Debug)]
pub struct MembershipCache {
    authority: Party,
    state: RwLock<CacheState>,
}

impl MembershipCache {
    /// Empty, never-synced cache for `authority`
    pub fn new(authority: Party) -> Self {
        Self {
            authority,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Authority this cache mirrors
    pub fn authority(&self) -> &Party {
        &self.authority
    }

    /// Replace the whole directory with `records` obtained at `now`.
    ///
    /// Returns the new contents.
    pub fn replace_all(&self, records: Vec<MembershipRecord>, now: PhysicalTime) -> Directory {
        let entries: BTreeMap<Party, CachedEntry> = records
            .into_iter()
            .map(|record| {
                (
                    record.member().clone(),
                    CachedEntry {
                        record,
                        obtained_at: now,
                    },
                )
            })
            .collect();
        let directory = entries
            .iter()
            .map(|(member, entry)| (member.clone(), entry.record.clone()))
            .collect();

        let mut state = self.state.write();
        state.entries = entries;
        state.last_full_sync_at = Some(now);
        directory
    }

    /// Merge a pushed record by key replacement.
    ///
    /// Records from another authority, and records older than the cached
    /// version of the same member, are ignored. Returns whether the cache
    /// changed.
    pub fn apply_delta(&self, record: MembershipRecord, now: PhysicalTime) -> bool {
        if record.authority() != &self.authority {
            tracing::warn!(
                cache = %self.authority,
                issuer = %record.authority(),
                "delta issued by another authority ignored"
            );
            return false;
        }

        let mut state = self.state.write();
        if let Some(cached) = state.entries.get(record.member()) {
            if cached.record.ledger_ref.version > record.ledger_ref.version {
                tracing::debug!(
                    member = %record.member(),
                    cached = %cached.record.ledger_ref,
                    received = %record.ledger_ref,
                    "stale delta ignored"
                );
                return false;
            }
        }
        state.entries.insert(
            record.member().clone(),
            CachedEntry {
                record,
                obtained_at: now,
            },
        );
        true
    }

    /// Cached record of `member`
    pub fn get(&self, member: &Party) -> Option<MembershipRecord> {
        self.state
            .read()
            .entries
            .get(member)
            .map(|entry| entry.record.clone())
    }

    /// Cached entry of `member`, including when it was obtained
    pub fn entry(&self, member: &Party) -> Option<CachedEntry> {
        self.state.read().entries.get(member).cloned()
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Directory {
        self.state
            .read()
            .entries
            .iter()
            .map(|(member, entry)| (member.clone(), entry.record.clone()))
            .collect()
    }

    /// When the last full sync happened
    pub fn last_full_sync_at(&self) -> Option<PhysicalTime> {
        self.state.read().last_full_sync_at
    }

    /// Whether a read at `now` needs a fresh sync.
    ///
    /// A never-synced cache is always stale. Otherwise it goes stale once
    /// `refresh_interval_ms` (if configured) has passed since the last sync.
    pub fn is_stale(&self, now: PhysicalTime, refresh_interval_ms: Option<u64>) -> bool {
        match (self.last_full_sync_at(), refresh_interval_ms) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(synced), Some(interval)) => now.since(synced) >= interval,
        }
    }

    /// Number of cached records
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Whether the cache holds no records
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bnms_core::{
        LedgerRef, MembershipMetadata, MembershipState, MembershipStatus, PartyId, PartyName,
    };

    fn party(name: &str, seed: u8) -> Party {
        Party::new(
            PartyName::parse(name).unwrap(),
            PartyId::new_from_entropy([seed; 32]),
        )
    }

    fn record(
        authority: &Party,
        member: &Party,
        status: MembershipStatus,
        version: u64,
    ) -> MembershipRecord {
        let state =
            MembershipState::pending(authority.clone(), member.clone(), MembershipMetadata::empty())
                .with_status(status);
        MembershipRecord::new(state.clone(), LedgerRef::for_state(&state, version))
    }

    #[test]
    fn test_new_cache_is_stale_until_synced() {
        let bno = party("O=BNO,L=New York,C=US", 1);
        let cache = MembershipCache::new(bno);
        assert!(cache.is_stale(PhysicalTime::from_ms(0), None));

        cache.replace_all(Vec::new(), PhysicalTime::from_ms(100));
        assert!(!cache.is_stale(PhysicalTime::from_ms(1_000_000), None));
        assert!(!cache.is_stale(PhysicalTime::from_ms(149), Some(50)));
        assert!(cache.is_stale(PhysicalTime::from_ms(150), Some(50)));
    }

    #[test]
    fn test_replace_all_drops_previous_entries() {
        let bno = party("O=BNO,L=New York,C=US", 1);
        let m1 = party("O=Member1,L=London,C=GB", 2);
        let m2 = party("O=Member2,L=London,C=GB", 3);
        let cache = MembershipCache::new(bno.clone());

        cache.replace_all(
            vec![record(&bno, &m1, MembershipStatus::Active, 2)],
            PhysicalTime::from_ms(1),
        );
        let directory = cache.replace_all(
            vec![record(&bno, &m2, MembershipStatus::Active, 2)],
            PhysicalTime::from_ms(2),
        );

        assert_eq!(directory.len(), 1);
        assert!(cache.get(&m1).is_none());
        assert_eq!(cache.entry(&m2).unwrap().obtained_at, PhysicalTime::from_ms(2));
        assert_eq!(cache.last_full_sync_at(), Some(PhysicalTime::from_ms(2)));
    }

    #[test]
    fn test_delta_replaces_single_entry() {
        let bno = party("O=BNO,L=New York,C=US", 1);
        let m1 = party("O=Member1,L=London,C=GB", 2);
        let m2 = party("O=Member2,L=London,C=GB", 3);
        let cache = MembershipCache::new(bno.clone());
        cache.replace_all(
            vec![
                record(&bno, &m1, MembershipStatus::Active, 2),
                record(&bno, &m2, MembershipStatus::Active, 2),
            ],
            PhysicalTime::from_ms(1),
        );

        let suspended = record(&bno, &m1, MembershipStatus::Suspended, 3);
        assert!(cache.apply_delta(suspended.clone(), PhysicalTime::from_ms(5)));
        assert_eq!(cache.get(&m1), Some(suspended));
        assert!(cache.get(&m2).unwrap().is_active());
        // A delta is not a full sync.
        assert_eq!(cache.last_full_sync_at(), Some(PhysicalTime::from_ms(1)));
    }

    #[test]
    fn test_stale_and_foreign_deltas_are_ignored() {
        let bno = party("O=BNO,L=New York,C=US", 1);
        let other_bno = party("O=BNO_1,L=New York,C=US", 9);
        let m1 = party("O=Member1,L=London,C=GB", 2);
        let cache = MembershipCache::new(bno.clone());
        cache.replace_all(
            vec![record(&bno, &m1, MembershipStatus::Suspended, 4)],
            PhysicalTime::from_ms(1),
        );

        assert!(!cache.apply_delta(
            record(&bno, &m1, MembershipStatus::Active, 3),
            PhysicalTime::from_ms(2)
        ));
        assert!(!cache.apply_delta(
            record(&other_bno, &m1, MembershipStatus::Active, 9),
            PhysicalTime::from_ms(2)
        ));
        assert!(cache.get(&m1).unwrap().is_suspended());
    }
}

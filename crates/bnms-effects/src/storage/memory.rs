//! In-memory membership store

use async_trait::async_trait;
use bnms_core::effects::MembershipStoreEffects;
use bnms_core::{
    LedgerRef, MembershipRecord, MembershipState, Party, StoreError, StoreResult,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type RecordKey = (Party, Party);

/// In-memory record store with expected-version writes.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryMembershipStore {
    records: Arc<RwLock<BTreeMap<RecordKey, MembershipRecord>>>,
}

impl MemoryMembershipStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all authorities
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl MembershipStoreEffects for MemoryMembershipStore {
    async fn get(
        &self,
        authority: &Party,
        member: &Party,
    ) -> StoreResult<Option<MembershipRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(&(authority.clone(), member.clone()))
            .cloned())
    }

    async fn put(
        &self,
        state: MembershipState,
        expected: Option<&LedgerRef>,
    ) -> StoreResult<MembershipRecord> {
        let key = (state.authority.clone(), state.member.clone());
        let mut records = self.records.write().await;

        let current = records.get(&key).map(|record| record.ledger_ref);
        if current != expected.copied() {
            return Err(StoreError::VersionConflict {
                member: state.member.clone(),
                expected: expected.map(|r| r.version),
                found: current.map(|r| r.version),
            });
        }

        let version = current.map(|r| r.version + 1).unwrap_or(1);
        let ledger_ref = LedgerRef::for_state(&state, version);
        let record = MembershipRecord::new(state, ledger_ref);
        records.insert(key, record.clone());

        tracing::trace!(
            member = %record.member(),
            ledger_ref = %record.ledger_ref,
            "record committed"
        );
        Ok(record)
    }

    async fn list(&self, authority: &Party) -> StoreResult<Vec<MembershipRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|((owner, _), _)| owner == authority)
            .map(|(_, record)| record.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bnms_core::{MembershipMetadata, MembershipStatus, PartyId, PartyName};

    fn party(name: &str, seed: u8) -> Party {
        Party::new(
            PartyName::parse(name).unwrap(),
            PartyId::new_from_entropy([seed; 32]),
        )
    }

    fn pending(authority: &Party, member: &Party) -> MembershipState {
        MembershipState::pending(authority.clone(), member.clone(), MembershipMetadata::empty())
    }

    #[tokio::test]
    async fn test_first_write_requires_absent_key() {
        let store = MemoryMembershipStore::new();
        let bno = party("O=BNO,L=New York,C=US", 1);
        let member = party("O=Member1,L=London,C=GB", 2);

        let record = store.put(pending(&bno, &member), None).await.unwrap();
        assert_eq!(record.ledger_ref.version, 1);

        let err = store.put(pending(&bno, &member), None).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict {
                expected: None,
                found: Some(1),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_stale_writer_is_rejected() {
        let store = MemoryMembershipStore::new();
        let bno = party("O=BNO,L=New York,C=US", 1);
        let member = party("O=Member1,L=London,C=GB", 2);

        let v1 = store.put(pending(&bno, &member), None).await.unwrap();
        let active = v1.state.with_status(MembershipStatus::Active);
        let v2 = store.put(active.clone(), Some(&v1.ledger_ref)).await.unwrap();
        assert_eq!(v2.ledger_ref.version, 2);

        // A writer still holding v1 loses.
        let suspended = active.with_status(MembershipStatus::Suspended);
        assert!(store.put(suspended, Some(&v1.ledger_ref)).await.is_err());

        let stored = store.get(&bno, &member).await.unwrap().unwrap();
        assert_eq!(stored, v2);
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_authority() {
        let store = MemoryMembershipStore::new();
        let bno_a = party("O=BNO_0,L=New York,C=US", 1);
        let bno_b = party("O=BNO_1,L=New York,C=US", 2);
        let member = party("O=Member1,L=London,C=GB", 3);

        store.put(pending(&bno_a, &member), None).await.unwrap();
        store.put(pending(&bno_b, &member), None).await.unwrap();

        assert_eq!(store.list(&bno_a).await.unwrap().len(), 1);
        assert_eq!(store.len().await, 2);
        assert!(store
            .get(&bno_a, &party("O=Nobody,L=Paris,C=FR", 4))
            .await
            .unwrap()
            .is_none());
    }
}

//! Authoritative membership store interface
//!
//! The store stands in for the ledger platform. It is keyed by
//! `(authority, member)` and offers put-with-expected-version: a write names
//! the [`LedgerRef`] it was derived from (or `None` for a first write) and is
//! rejected with [`StoreError::VersionConflict`] if the stored record moved
//! on in the meantime. Commit order per key is therefore total.

use crate::errors::StoreResult;
use crate::identifiers::Party;
use crate::record::{LedgerRef, MembershipRecord, MembershipState};
use async_trait::async_trait;

/// Durable map of `(authority, member)` to the latest committed record.
///
/// [`StoreError::VersionConflict`]: crate::errors::StoreError::VersionConflict
#[async_trait]
pub trait MembershipStoreEffects: Send + Sync {
    /// Latest committed record for a member, if any.
    async fn get(
        &self,
        authority: &Party,
        member: &Party,
    ) -> StoreResult<Option<MembershipRecord>>;

    /// Commit `state` over the record identified by `expected`.
    ///
    /// `expected == None` means the key must not exist yet. On success the
    /// returned record carries the new ledger reference, one version above
    /// the previous one.
    async fn put(
        &self,
        state: MembershipState,
        expected: Option<&LedgerRef>,
    ) -> StoreResult<MembershipRecord>;

    /// Every record issued by `authority`, in member order.
    async fn list(&self, authority: &Party) -> StoreResult<Vec<MembershipRecord>>;
}

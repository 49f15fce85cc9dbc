//! Verification guard
//!
//! Precondition check for business protocols: is the counterparty an active
//! member? Answers from the local cache only, so it never waits on the
//! network and may lag the authority by one sync or push.

use crate::cache::MembershipCache;
use bnms_core::{MembershipError, MembershipRecord, MembershipResult, Party};
use std::sync::Arc;

/// Checks counterparties against a cached directory.
#[derive(Debug, Clone)]
pub struct VerificationGuard {
    cache: Arc<MembershipCache>,
}

impl VerificationGuard {
    /// Guard reading `cache`
    pub fn new(cache: Arc<MembershipCache>) -> Self {
        Self { cache }
    }

    /// Authority whose directory this guard consults
    pub fn authority(&self) -> &Party {
        self.cache.authority()
    }

    /// Succeeds with the cached record iff `party` is cached as active.
    pub fn require_active_member(&self, party: &Party) -> MembershipResult<MembershipRecord> {
        let result = match self.cache.get(party) {
            None => Err(MembershipError::not_a_member(party)),
            Some(record) if !record.is_active() => {
                Err(MembershipError::membership_not_active(party))
            }
            Some(record) => Ok(record),
        };
        if let Err(err) = &result {
            tracing::debug!(
                authority = %self.cache.authority(),
                party = %party,
                error = %err,
                "counterparty check failed"
            );
        }
        result
    }

    /// Check several counterparties; fails on the first that is not active.
    pub fn require_all_active<'a, I>(&self, parties: I) -> MembershipResult<Vec<MembershipRecord>>
    where
        I: IntoIterator<Item = &'a Party>,
    {
        parties
            .into_iter()
            .map(|party| self.require_active_member(party))
            .collect()
    }
}

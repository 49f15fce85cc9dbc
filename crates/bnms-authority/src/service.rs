//! Authority Service
//!
//! The single writer of the authority's membership records. Every mutation
//! runs the same sequence under a per-member lock:
//!
//! 1. read the current record from the store
//! 2. evaluate the command with the state machine
//! 3. commit with the ledger reference read in step 1
//! 4. hand the committed record to the notification dispatcher
//!
//! The lock orders operations on one member; the store's expected-version
//! check catches any writer that bypasses this service.

use crate::notifications::{DispatchReport, NotificationDispatcher};
use crate::state_machine::{evaluate, MembershipCommand, Transition};
use bnms_core::effects::{MembershipStoreEffects, TransportEffects};
use bnms_core::{
    AuthorityConfig, MembershipError, MembershipMetadata, MembershipRecord, MembershipResult,
    Party,
};
use std::collections::HashMap;
use std::sync::Arc;

type MemberLock = Arc<tokio::sync::Mutex<()>>;
type LockTable = parking_lot::Mutex<HashMap<Party, MemberLock>>;

/// Held member lock. On drop the table entry goes away once nobody else
/// holds or waits on it.
struct MemberLockGuard<'a> {
    table: &'a LockTable,
    member: Party,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for MemberLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut table = self.table.lock();
        if table
            .get(&self.member)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.member);
        }
    }
}

/// Result of applying one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Record after the command
    pub record: MembershipRecord,
    /// Whether a new version was committed
    pub committed: bool,
    /// Delivery summary of the resulting notification
    pub dispatch: DispatchReport,
}

/// Authority-side membership operations.
pub struct AuthorityService {
    authority: Party,
    store: Arc<dyn MembershipStoreEffects>,
    dispatcher: NotificationDispatcher,
    locks: LockTable,
}

impl AuthorityService {
    /// Create a service issuing records as the transport's local party.
    pub fn new(
        config: &AuthorityConfig,
        store: Arc<dyn MembershipStoreEffects>,
        transport: Arc<dyn TransportEffects>,
    ) -> Self {
        let authority = transport.local_party().clone();
        let dispatcher =
            NotificationDispatcher::new(config.notifications_enabled, store.clone(), transport);
        Self {
            authority,
            store,
            dispatcher,
            locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Identity records are issued under
    pub fn authority(&self) -> &Party {
        &self.authority
    }

    /// The dispatcher this service notifies through
    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    async fn lock_member(&self, member: &Party) -> MemberLockGuard<'_> {
        let lock = self
            .locks
            .lock()
            .entry(member.clone())
            .or_default()
            .clone();
        MemberLockGuard {
            table: &self.locks,
            member: member.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Apply a command to `member`'s record.
    pub async fn apply(
        &self,
        member: &Party,
        command: MembershipCommand,
    ) -> MembershipResult<CommandOutcome> {
        let operation = command.operation();
        // Held through dispatch so deltas for one member leave in commit order.
        let _guard = self.lock_member(member).await;

        let current = self.store.get(&self.authority, member).await?;
        let transition = match evaluate(&self.authority, member, current.as_ref(), command) {
            Ok(transition) => transition,
            Err(err) => {
                tracing::warn!(
                    member = %member,
                    operation = %operation,
                    error = %err,
                    "membership command rejected"
                );
                return Err(err);
            }
        };

        match transition {
            Transition::Unchanged(record) => {
                tracing::debug!(
                    member = %member,
                    operation = %operation,
                    status = %record.status(),
                    "membership already in requested state"
                );
                Ok(CommandOutcome {
                    record,
                    committed: false,
                    dispatch: DispatchReport::skipped(),
                })
            }
            Transition::Commit { state, expected } => {
                let record = self.store.put(state, expected.as_ref()).await?;
                tracing::info!(
                    member = %member,
                    operation = %operation,
                    status = %record.status(),
                    ledger_ref = %record.ledger_ref,
                    "membership committed"
                );
                let dispatch = self.dispatcher.dispatch(&record).await;
                Ok(CommandOutcome {
                    record,
                    committed: true,
                    dispatch,
                })
            }
        }
    }

    /// Create a pending membership for `member`.
    pub async fn request_membership(
        &self,
        member: &Party,
        metadata: MembershipMetadata,
    ) -> MembershipResult<MembershipRecord> {
        self.apply(member, MembershipCommand::Request { metadata })
            .await
            .map(|outcome| outcome.record)
    }

    /// Activate a pending or suspended membership.
    pub async fn activate(&self, member: &Party) -> MembershipResult<MembershipRecord> {
        self.apply(member, MembershipCommand::Activate)
            .await
            .map(|outcome| outcome.record)
    }

    /// Suspend an active membership.
    pub async fn suspend(&self, member: &Party) -> MembershipResult<MembershipRecord> {
        self.apply(member, MembershipCommand::Suspend)
            .await
            .map(|outcome| outcome.record)
    }

    /// Replace the metadata of an active membership.
    pub async fn amend_metadata(
        &self,
        member: &Party,
        metadata: MembershipMetadata,
    ) -> MembershipResult<MembershipRecord> {
        self.apply(member, MembershipCommand::AmendMetadata { metadata })
            .await
            .map(|outcome| outcome.record)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Record of one member, if any.
    pub async fn membership(&self, member: &Party) -> MembershipResult<Option<MembershipRecord>> {
        Ok(self.store.get(&self.authority, member).await?)
    }

    /// Every record this authority issued, all statuses.
    pub async fn memberships(&self) -> MembershipResult<Vec<MembershipRecord>> {
        Ok(self.store.list(&self.authority).await?)
    }

    /// Records currently active.
    pub async fn active_members(&self) -> MembershipResult<Vec<MembershipRecord>> {
        let mut records = self.memberships().await?;
        records.retain(MembershipRecord::is_active);
        Ok(records)
    }

    /// Full directory for a sync request from `requester`.
    ///
    /// Only active members may pull the directory.
    pub async fn directory_for(&self, requester: &Party) -> MembershipResult<Vec<MembershipRecord>> {
        let own = self.store.get(&self.authority, requester).await?;
        let denied = match own {
            None => Some(MembershipError::not_a_member(requester)),
            Some(record) if !record.is_active() => {
                Some(MembershipError::membership_not_active(requester))
            }
            Some(_) => None,
        };
        if let Some(err) = denied {
            tracing::warn!(requester = %requester, error = %err, "directory sync refused");
            return Err(err);
        }

        let records = self.memberships().await?;
        tracing::debug!(
            requester = %requester,
            records = records.len(),
            "directory served"
        );
        Ok(records)
    }
}

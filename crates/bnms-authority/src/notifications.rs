//! Notification Dispatcher
//!
//! Pushes a freshly committed record to every member that is active in the
//! authority's own store. Delivery is best-effort: failures are logged and
//! reported back, never propagated into the mutation that triggered them.

use bnms_core::effects::{MembershipStoreEffects, TransportEffects};
use bnms_core::messages::MembershipDelta;
use bnms_core::{MembershipRecord, Party, StoreResult, TransportError};
use std::sync::Arc;

/// Outcome of one dispatch round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Number of recipients a delta was sent to
    pub attempted: usize,
    /// Number of recipients that accepted the delta
    pub delivered: usize,
    /// Recipients whose delivery failed
    pub failed: Vec<(Party, TransportError)>,
}

impl DispatchReport {
    /// Report for a dispatcher that is switched off
    pub fn skipped() -> Self {
        Self::default()
    }

    /// Whether every attempted delivery succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fans committed records out to active members.
pub struct NotificationDispatcher {
    enabled: bool,
    store: Arc<dyn MembershipStoreEffects>,
    transport: Arc<dyn TransportEffects>,
}

impl NotificationDispatcher {
    /// Create a dispatcher; with `enabled == false` every dispatch is a no-op.
    pub fn new(
        enabled: bool,
        store: Arc<dyn MembershipStoreEffects>,
        transport: Arc<dyn TransportEffects>,
    ) -> Self {
        Self {
            enabled,
            store,
            transport,
        }
    }

    /// Whether pushes are sent
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Active members that would receive a push right now.
    pub async fn recipients(&self) -> StoreResult<Vec<Party>> {
        let authority = self.transport.local_party();
        let records = self.store.list(authority).await?;
        Ok(records
            .into_iter()
            .filter(|record| record.is_active() && record.member() != authority)
            .map(|record| record.member().clone())
            .collect())
    }

    /// Push `record` to all current recipients.
    ///
    /// Recipients are read after the commit, so a member that was just
    /// suspended is left out and one that was just activated is included.
    pub async fn dispatch(&self, record: &MembershipRecord) -> DispatchReport {
        if !self.enabled {
            return DispatchReport::skipped();
        }

        let recipients = match self.recipients().await {
            Ok(recipients) => recipients,
            Err(err) => {
                tracing::warn!(
                    member = %record.member(),
                    error = %err,
                    "could not list recipients; notification skipped"
                );
                return DispatchReport::skipped();
            }
        };

        let mut report = DispatchReport {
            attempted: recipients.len(),
            ..DispatchReport::default()
        };
        for recipient in recipients {
            let delta = MembershipDelta {
                record: record.clone(),
            };
            match self.transport.push_delta(&recipient, delta).await {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    tracing::warn!(
                        recipient = %recipient,
                        member = %record.member(),
                        error = %err,
                        "membership delta not delivered"
                    );
                    report.failed.push((recipient, err));
                }
            }
        }

        tracing::debug!(
            member = %record.member(),
            status = %record.status(),
            attempted = report.attempted,
            delivered = report.delivered,
            "membership delta dispatched"
        );
        report
    }
}

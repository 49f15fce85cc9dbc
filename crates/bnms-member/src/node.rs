//! Member Node
//!
//! A member talks only to whitelisted authorities. The whitelist holds names
//! and is resolved on every use, so an authority that drops off the network
//! map stops being reachable without a restart. One cache (and sync client)
//! is kept per authority.

use crate::cache::MembershipCache;
use crate::guard::VerificationGuard;
use crate::sync::DirectorySyncClient;
use bnms_core::effects::{IdentityResolverEffects, PhysicalTimeEffects, TransportEffects};
use bnms_core::messages::{Inbound, MembershipDelta, MembershipRequest, MembershipResponse};
use bnms_core::{
    Directory, MemberConfig, MembershipError, MembershipMetadata, MembershipRecord,
    MembershipResult, Party,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Member process: protocol initiator, cache holder and delta listener.
pub struct MemberNode {
    config: MemberConfig,
    transport: Arc<dyn TransportEffects>,
    resolver: Arc<dyn IdentityResolverEffects>,
    clock: Arc<dyn PhysicalTimeEffects>,
    clients: parking_lot::Mutex<BTreeMap<Party, Arc<DirectorySyncClient>>>,
}

impl MemberNode {
    /// Assemble a node speaking as the transport's local party.
    pub fn new(
        config: MemberConfig,
        transport: Arc<dyn TransportEffects>,
        resolver: Arc<dyn IdentityResolverEffects>,
        clock: Arc<dyn PhysicalTimeEffects>,
    ) -> Self {
        Self {
            config,
            transport,
            resolver,
            clock,
            clients: parking_lot::Mutex::new(BTreeMap::new()),
        }
    }

    /// Member identity
    pub fn party(&self) -> &Party {
        self.transport.local_party()
    }

    /// Effective member configuration
    pub fn config(&self) -> &MemberConfig {
        &self.config
    }

    // =========================================================================
    // Whitelist
    // =========================================================================

    /// Whitelisted authorities that currently resolve.
    pub async fn whitelisted_authorities(&self) -> Vec<Party> {
        let mut authorities = Vec::new();
        for name in self.config.whitelist_names() {
            match self.resolver.resolve(&name).await {
                Some(party) => authorities.push(party),
                None => tracing::warn!(
                    authority = %name,
                    "whitelisted authority can't be resolved on the network"
                ),
            }
        }
        authorities
    }

    /// Fail unless `authority` is whitelisted and resolves to this identity.
    pub async fn check_whitelisted(&self, authority: &Party) -> MembershipResult<()> {
        if self.whitelisted_authorities().await.contains(authority) {
            Ok(())
        } else {
            Err(MembershipError::authority_not_whitelisted(authority))
        }
    }

    /// Sync client for `authority`, created on first use. Callers check the
    /// whitelist first.
    fn client(&self, authority: &Party) -> Arc<DirectorySyncClient> {
        self.clients
            .lock()
            .entry(authority.clone())
            .or_insert_with(|| {
                Arc::new(DirectorySyncClient::new(
                    &self.config,
                    Arc::new(MembershipCache::new(authority.clone())),
                    self.transport.clone(),
                    self.resolver.clone(),
                    self.clock.clone(),
                ))
            })
            .clone()
    }

    /// Cache holding `authority`'s directory.
    ///
    /// An authority this node has not exchanged with yet gets an empty cache
    /// that is not retained.
    pub fn cache(&self, authority: &Party) -> Arc<MembershipCache> {
        self.clients
            .lock()
            .get(authority)
            .map(|client| client.cache().clone())
            .unwrap_or_else(|| Arc::new(MembershipCache::new(authority.clone())))
    }

    /// Guard over `authority`'s cached directory
    pub fn guard(&self, authority: &Party) -> VerificationGuard {
        VerificationGuard::new(self.cache(authority))
    }

    // =========================================================================
    // Protocol initiators
    // =========================================================================

    async fn exchange(
        &self,
        authority: &Party,
        request: MembershipRequest,
    ) -> MembershipResult<MembershipResponse> {
        self.check_whitelisted(authority).await?;
        let kind = request.kind();
        let response = self
            .transport
            .request(authority, request, self.config.request_timeout())
            .await?;
        match response {
            MembershipResponse::Rejected(err) => {
                tracing::warn!(authority = %authority, request = kind, error = %err, "request refused");
                Err(err)
            }
            response => Ok(response),
        }
    }

    async fn exchange_for_record(
        &self,
        authority: &Party,
        request: MembershipRequest,
    ) -> MembershipResult<MembershipRecord> {
        match self.exchange(authority, request).await? {
            MembershipResponse::Record(record) => Ok(record),
            _ => Err(MembershipError::unexpected_response("record")),
        }
    }

    /// Ask `authority` for a membership; the result is pending.
    pub async fn request_membership(
        &self,
        authority: &Party,
        metadata: MembershipMetadata,
    ) -> MembershipResult<MembershipRecord> {
        let record = self
            .exchange_for_record(authority, MembershipRequest::RequestMembership { metadata })
            .await?;
        tracing::info!(
            authority = %authority,
            status = %record.status(),
            "membership requested"
        );
        Ok(record)
    }

    /// Ask `authority` to replace this member's metadata.
    pub async fn amend_metadata(
        &self,
        authority: &Party,
        metadata: MembershipMetadata,
    ) -> MembershipResult<MembershipRecord> {
        let record = self
            .exchange_for_record(authority, MembershipRequest::AmendMetadata { metadata })
            .await?;
        let now = self.clock.physical_time().await;
        self.client(authority).cache().apply_delta(record.clone(), now);
        Ok(record)
    }

    /// Directory of `authority`, filtered per configuration.
    pub async fn memberships(
        &self,
        authority: &Party,
        force_full_refresh: bool,
    ) -> MembershipResult<Directory> {
        self.memberships_filtered(
            authority,
            force_full_refresh,
            self.config.filter_out_unresolvable,
        )
        .await
    }

    /// Directory of `authority` with an explicit filtering choice.
    pub async fn memberships_filtered(
        &self,
        authority: &Party,
        force_full_refresh: bool,
        filter_out_unresolvable: bool,
    ) -> MembershipResult<Directory> {
        self.check_whitelisted(authority).await?;
        self.client(authority)
            .memberships(force_full_refresh, filter_out_unresolvable)
            .await
    }

    /// Report the version of an application component to `authority`.
    pub async fn report_version(
        &self,
        authority: &Party,
        group: &str,
        name: &str,
        version: &str,
    ) -> MembershipResult<()> {
        let request = MembershipRequest::ReportVersion {
            group: group.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        };
        match self.exchange(authority, request).await? {
            MembershipResponse::Acknowledged => Ok(()),
            _ => Err(MembershipError::unexpected_response("acknowledgement")),
        }
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Merge a pushed delta. Returns whether the cache changed.
    pub async fn handle_delta(&self, from: &Party, delta: MembershipDelta) -> bool {
        if let Err(err) = self.check_whitelisted(from).await {
            tracing::warn!(from = %from, error = %err, "delta dropped");
            return false;
        }
        if delta.record.authority() != from {
            tracing::warn!(
                from = %from,
                issuer = %delta.record.authority(),
                "delta for another authority's record dropped"
            );
            return false;
        }

        let now = self.clock.physical_time().await;
        let member = delta.record.member().clone();
        let status = delta.record.status();
        let applied = self.client(from).cache().apply_delta(delta.record, now);
        if applied {
            tracing::debug!(authority = %from, member = %member, status = %status, "delta applied");
        }
        applied
    }

    /// Listen for deltas on `inbox` until every sender is gone.
    ///
    /// Members serve no requests; any that arrive are refused so the sender
    /// does not wait for its timeout.
    pub fn spawn(self: Arc<Self>, mut inbox: mpsc::UnboundedReceiver<Inbound>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(inbound) = inbox.recv().await {
                match inbound {
                    Inbound::Delta { from, delta } => {
                        self.handle_delta(&from, delta).await;
                    }
                    Inbound::Request {
                        from,
                        correlation_id,
                        request,
                    } => {
                        tracing::debug!(from = %from, request = request.kind(), "member refuses request");
                        let refusal = MembershipResponse::Rejected(MembershipError::invalid_request(
                            "members do not serve membership requests",
                        ));
                        if let Err(err) = self.transport.respond(&from, correlation_id, refusal).await {
                            tracing::warn!(to = %from, error = %err, "refusal not delivered");
                        }
                    }
                }
            }
            tracing::debug!(member = %self.party(), "member listener stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bnms_core::{LedgerRef, MembershipState, MembershipStatus, PartyName};
    use bnms_effects::{InMemoryNetwork, NetworkMapResolver, SimulatedTimeHandler};

    fn name(s: &str) -> PartyName {
        PartyName::parse(s).unwrap()
    }

    fn record(authority: &Party, member: &Party, status: MembershipStatus) -> MembershipRecord {
        let state =
            MembershipState::pending(authority.clone(), member.clone(), MembershipMetadata::empty())
                .with_status(status);
        MembershipRecord::new(state.clone(), LedgerRef::for_state(&state, 1))
    }

    fn member_node(
        whitelist: &[&str],
        resolver: &NetworkMapResolver,
        network: &InMemoryNetwork,
    ) -> MemberNode {
        let party = resolver.register(name("O=Member1,L=London,C=GB"));
        let (endpoint, _inbox) = network.register(party);
        let config = MemberConfig {
            authority_whitelist: whitelist.iter().map(|s| s.to_string()).collect(),
            ..MemberConfig::default()
        };
        MemberNode::new(
            config,
            endpoint,
            Arc::new(resolver.clone()),
            Arc::new(SimulatedTimeHandler::new(0)),
        )
    }

    #[tokio::test]
    async fn test_unresolvable_whitelist_entries_are_skipped() {
        let resolver = NetworkMapResolver::new();
        let network = InMemoryNetwork::new();
        let bno = resolver.register(name("O=BNO_0,L=New York,C=US"));
        let node = member_node(
            &["O=BNO_0,L=New York,C=US", "O=BNO_1,L=New York,C=US"],
            &resolver,
            &network,
        );

        assert_eq!(node.whitelisted_authorities().await, vec![bno]);
    }

    #[tokio::test]
    async fn test_non_whitelisted_authority_is_refused_before_sending() {
        let resolver = NetworkMapResolver::new();
        let network = InMemoryNetwork::new();
        let rogue = resolver.register(name("O=Rogue,L=Paris,C=FR"));
        let node = member_node(&["O=BNO,L=New York,C=US"], &resolver, &network);

        assert_eq!(
            node.memberships(&rogue, true).await,
            Err(MembershipError::authority_not_whitelisted(&rogue))
        );
        assert_eq!(
            node.request_membership(&rogue, MembershipMetadata::empty())
                .await,
            Err(MembershipError::authority_not_whitelisted(&rogue))
        );
    }

    #[tokio::test]
    async fn test_deltas_only_accepted_from_whitelisted_issuer() {
        let resolver = NetworkMapResolver::new();
        let network = InMemoryNetwork::new();
        let bno = resolver.register(name("O=BNO,L=New York,C=US"));
        let rogue = resolver.register(name("O=Rogue,L=Paris,C=FR"));
        let node = member_node(&["O=BNO,L=New York,C=US"], &resolver, &network);
        let other = resolver.register(name("O=Member2,L=London,C=GB"));

        let from_rogue = record(&rogue, &other, MembershipStatus::Active);
        assert!(
            !node
                .handle_delta(&rogue, MembershipDelta { record: from_rogue })
                .await
        );
        // Whitelisted sender relaying a record it did not issue.
        let relayed = record(&rogue, &other, MembershipStatus::Active);
        assert!(
            !node
                .handle_delta(&bno, MembershipDelta { record: relayed })
                .await
        );

        assert!(node.clients.lock().is_empty());

        let genuine = record(&bno, &other, MembershipStatus::Active);
        assert!(
            node.handle_delta(&bno, MembershipDelta { record: genuine })
                .await
        );
        assert!(node.guard(&bno).require_active_member(&other).is_ok());
    }

    #[tokio::test]
    async fn test_cache_lookups_do_not_register_authorities() {
        let resolver = NetworkMapResolver::new();
        let network = InMemoryNetwork::new();
        let rogue = resolver.register(name("O=Rogue,L=Paris,C=FR"));
        let node = member_node(&["O=BNO,L=New York,C=US"], &resolver, &network);
        let other = resolver.register(name("O=Member2,L=London,C=GB"));

        assert!(node.cache(&rogue).is_empty());
        assert_eq!(
            node.guard(&rogue).require_active_member(&other),
            Err(MembershipError::not_a_member(&other))
        );
        assert!(node.clients.lock().is_empty());
    }
}

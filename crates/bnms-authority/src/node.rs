//! Authority Node
//!
//! Serves member requests arriving on the authority's transport inbox. Each
//! request is handled on its own task and answered through
//! [`TransportEffects::respond`]; failures become `Rejected` replies so the
//! member sees the same error the service raised.

use crate::service::AuthorityService;
use bnms_core::effects::{MembershipStoreEffects, TransportEffects};
use bnms_core::messages::{Inbound, MembershipRequest, MembershipResponse};
use bnms_core::{AuthorityConfig, MembershipError, Party};
use bnms_versions::{VersionError, VersionReportingService};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Authority process: membership service plus version reporting.
pub struct AuthorityNode {
    service: AuthorityService,
    versions: VersionReportingService,
    transport: Arc<dyn TransportEffects>,
}

impl AuthorityNode {
    /// Assemble a node speaking as the transport's local party.
    pub fn new(
        config: &AuthorityConfig,
        store: Arc<dyn MembershipStoreEffects>,
        transport: Arc<dyn TransportEffects>,
        versions: VersionReportingService,
    ) -> Self {
        Self {
            service: AuthorityService::new(config, store, transport.clone()),
            versions,
            transport,
        }
    }

    /// Authority identity
    pub fn party(&self) -> &Party {
        self.service.authority()
    }

    /// Operator access to the membership service
    pub fn service(&self) -> &AuthorityService {
        &self.service
    }

    /// Version reports received so far
    pub fn versions(&self) -> &VersionReportingService {
        &self.versions
    }

    /// Answer one request from `from`.
    pub async fn handle_request(&self, from: &Party, request: MembershipRequest) -> MembershipResponse {
        let kind = request.kind();
        tracing::debug!(from = %from, request = kind, "request received");

        let result = match request {
            MembershipRequest::RequestMembership { metadata } => self
                .service
                .request_membership(from, metadata)
                .await
                .map(MembershipResponse::Record),
            MembershipRequest::DirectorySync {
                force_full_refresh,
                filter_out_unresolvable,
            } => {
                tracing::debug!(
                    from = %from,
                    force_full_refresh,
                    filter_out_unresolvable,
                    "directory sync requested"
                );
                self.service
                    .directory_for(from)
                    .await
                    .map(|records| MembershipResponse::Directory { records })
            }
            MembershipRequest::AmendMetadata { metadata } => self
                .service
                .amend_metadata(from, metadata)
                .await
                .map(MembershipResponse::Record),
            MembershipRequest::ReportVersion {
                group,
                name,
                version,
            } => self
                .versions
                .report(from, &group, &name, &version)
                .await
                .map(|_| MembershipResponse::Acknowledged)
                .map_err(version_error),
        };

        result.unwrap_or_else(|err| {
            tracing::debug!(from = %from, request = kind, error = %err, "request rejected");
            MembershipResponse::Rejected(err)
        })
    }

    /// Serve `inbox` until every sender is gone.
    pub fn spawn(self: Arc<Self>, mut inbox: mpsc::UnboundedReceiver<Inbound>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(authority = %self.party(), "authority node serving");
            while let Some(inbound) = inbox.recv().await {
                match inbound {
                    Inbound::Request {
                        from,
                        correlation_id,
                        request,
                    } => {
                        let node = self.clone();
                        tokio::spawn(async move {
                            let response = node.handle_request(&from, request).await;
                            if let Err(err) =
                                node.transport.respond(&from, correlation_id, response).await
                            {
                                tracing::warn!(to = %from, error = %err, "reply not delivered");
                            }
                        });
                    }
                    Inbound::Delta { from, .. } => {
                        tracing::debug!(from = %from, "authority ignores pushed deltas");
                    }
                }
            }
            tracing::info!(authority = %self.party(), "authority node stopped");
        })
    }
}

fn version_error(err: VersionError) -> MembershipError {
    match err {
        VersionError::Backend(reason) => bnms_core::StoreError::Backend(reason).into(),
        other => MembershipError::invalid_request(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bnms_core::{PartyId, PartyName, SimpleMembershipMetadata};
    use bnms_effects::{InMemoryNetwork, MemoryMembershipStore, SimulatedTimeHandler};
    use bnms_versions::MemoryVersionStore;

    fn party(name: &str, seed: u8) -> Party {
        Party::new(
            PartyName::parse(name).unwrap(),
            PartyId::new_from_entropy([seed; 32]),
        )
    }

    fn node() -> AuthorityNode {
        let network = InMemoryNetwork::new();
        let (endpoint, _inbox) = network.register(party("O=BNO,L=New York,C=US", 1));
        let versions = VersionReportingService::new(
            Arc::new(MemoryVersionStore::new()),
            Arc::new(SimulatedTimeHandler::new(42)),
        );
        AuthorityNode::new(
            &AuthorityConfig::default(),
            Arc::new(MemoryMembershipStore::new()),
            endpoint,
            versions,
        )
    }

    #[tokio::test]
    async fn test_request_is_answered_with_record() {
        let node = node();
        let member = party("O=Member1,L=London,C=GB", 2);
        let response = node
            .handle_request(
                &member,
                MembershipRequest::RequestMembership {
                    metadata: SimpleMembershipMetadata::with_role("roleA").into(),
                },
            )
            .await;
        match response {
            MembershipResponse::Record(record) => {
                assert!(record.is_pending());
                assert_eq!(record.member(), &member);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sync_from_non_member_is_rejected() {
        let node = node();
        let stranger = party("O=Stranger,L=Paris,C=FR", 9);
        let response = node
            .handle_request(
                &stranger,
                MembershipRequest::DirectorySync {
                    force_full_refresh: true,
                    filter_out_unresolvable: true,
                },
            )
            .await;
        assert_eq!(
            response,
            MembershipResponse::Rejected(MembershipError::not_a_member(&stranger))
        );
    }

    #[tokio::test]
    async fn test_version_report_is_stored() {
        let node = node();
        let member = party("O=Member1,L=London,C=GB", 2);
        let response = node
            .handle_request(
                &member,
                MembershipRequest::ReportVersion {
                    group: "net.corda".to_string(),
                    name: "corda-finance".to_string(),
                    version: "4.0".to_string(),
                },
            )
            .await;
        assert_eq!(response, MembershipResponse::Acknowledged);

        let rows = node.versions().versions_for(&member).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].last_updated_ms, 42);
    }

    #[tokio::test]
    async fn test_invalid_version_report_is_rejected() {
        let node = node();
        let member = party("O=Member1,L=London,C=GB", 2);
        let response = node
            .handle_request(
                &member,
                MembershipRequest::ReportVersion {
                    group: "net.corda".to_string(),
                    name: String::new(),
                    version: "4.0".to_string(),
                },
            )
            .await;
        assert!(matches!(
            response,
            MembershipResponse::Rejected(MembershipError::InvalidRequest { .. })
        ));
    }
}

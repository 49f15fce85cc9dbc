//! Directory sync client
//!
//! Pulls an authority's directory into a [`MembershipCache`]. A pull is
//! skipped while the cache is fresh; see [`MembershipCache::is_stale`].
//!
//! Filtering of unresolvable identities happens twice: on the pulled
//! snapshot before it replaces the cache, and on reads served from the cache
//! without a round-trip (the network map may have changed since the pull).

use crate::cache::MembershipCache;
use bnms_core::effects::{IdentityResolverEffects, PhysicalTimeEffects, TransportEffects};
use bnms_core::messages::{MembershipRequest, MembershipResponse};
use bnms_core::{Directory, MemberConfig, MembershipError, MembershipRecord, MembershipResult};
use std::sync::Arc;
use std::time::Duration;

/// Sync client bound to one authority and its cache.
pub struct DirectorySyncClient {
    cache: Arc<MembershipCache>,
    transport: Arc<dyn TransportEffects>,
    resolver: Arc<dyn IdentityResolverEffects>,
    clock: Arc<dyn PhysicalTimeEffects>,
    request_timeout: Duration,
    refresh_interval_ms: Option<u64>,
}

impl DirectorySyncClient {
    /// Create a client filling `cache` from the cache's authority.
    pub fn new(
        config: &MemberConfig,
        cache: Arc<MembershipCache>,
        transport: Arc<dyn TransportEffects>,
        resolver: Arc<dyn IdentityResolverEffects>,
        clock: Arc<dyn PhysicalTimeEffects>,
    ) -> Self {
        Self {
            cache,
            transport,
            resolver,
            clock,
            request_timeout: config.request_timeout(),
            refresh_interval_ms: config.cache_refresh_interval_ms,
        }
    }

    /// Cache this client maintains
    pub fn cache(&self) -> &Arc<MembershipCache> {
        &self.cache
    }

    /// Current directory, pulling from the authority when needed.
    pub async fn memberships(
        &self,
        force_full_refresh: bool,
        filter_out_unresolvable: bool,
    ) -> MembershipResult<Directory> {
        let now = self.clock.physical_time().await;
        if force_full_refresh || self.cache.is_stale(now, self.refresh_interval_ms) {
            return self
                .pull(force_full_refresh, filter_out_unresolvable)
                .await;
        }

        let snapshot = self.cache.snapshot();
        if !filter_out_unresolvable {
            return Ok(snapshot);
        }
        let mut visible = Directory::new();
        for (member, record) in snapshot {
            if self.resolver.is_resolvable(&member).await {
                visible.insert(member, record);
            }
        }
        Ok(visible)
    }

    /// Round-trip to the authority and swap the cache.
    async fn pull(
        &self,
        force_full_refresh: bool,
        filter_out_unresolvable: bool,
    ) -> MembershipResult<Directory> {
        let authority = self.cache.authority();
        let request = MembershipRequest::DirectorySync {
            force_full_refresh,
            filter_out_unresolvable,
        };

        let response = self
            .transport
            .request(authority, request, self.request_timeout)
            .await?;
        let records = match response {
            MembershipResponse::Directory { records } => records,
            MembershipResponse::Rejected(err) => {
                tracing::warn!(authority = %authority, error = %err, "directory sync refused");
                return Err(err);
            }
            other => {
                tracing::warn!(authority = %authority, response = ?other, "unexpected sync reply");
                return Err(MembershipError::unexpected_response("directory"));
            }
        };

        let received = records.len();
        let records = self.retain_valid(records, filter_out_unresolvable).await;
        let now = self.clock.physical_time().await;
        let directory = self.cache.replace_all(records, now);

        tracing::debug!(
            authority = %authority,
            received,
            cached = directory.len(),
            "directory synced"
        );
        Ok(directory)
    }

    async fn retain_valid(
        &self,
        records: Vec<MembershipRecord>,
        filter_out_unresolvable: bool,
    ) -> Vec<MembershipRecord> {
        let authority = self.cache.authority();
        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            if record.authority() != authority {
                tracing::warn!(
                    authority = %authority,
                    issuer = %record.authority(),
                    member = %record.member(),
                    "dropping record issued by another authority"
                );
                continue;
            }
            if filter_out_unresolvable && !self.resolver.is_resolvable(record.member()).await {
                tracing::debug!(member = %record.member(), "dropping unresolvable member");
                continue;
            }
            kept.push(record);
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bnms_core::messages::Inbound;
    use bnms_core::{
        LedgerRef, MembershipMetadata, MembershipState, MembershipStatus, Party, PartyName,
        TransportError,
    };
    use bnms_effects::{InMemoryNetwork, NetworkMapResolver, SimulatedTimeHandler};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        network: InMemoryNetwork,
        resolver: NetworkMapResolver,
        clock: SimulatedTimeHandler,
        bno: Party,
        member: Party,
    }

    impl Fixture {
        fn new() -> Self {
            let resolver = NetworkMapResolver::new();
            let bno = resolver.register(PartyName::parse("O=BNO,L=New York,C=US").unwrap());
            let member = resolver.register(PartyName::parse("O=Member1,L=London,C=GB").unwrap());
            Self {
                network: InMemoryNetwork::new(),
                resolver,
                clock: SimulatedTimeHandler::new(1_000),
                bno,
                member,
            }
        }

        fn record(&self, member: &Party, status: MembershipStatus) -> MembershipRecord {
            let state = MembershipState::pending(
                self.bno.clone(),
                member.clone(),
                MembershipMetadata::empty(),
            )
            .with_status(status);
            MembershipRecord::new(state.clone(), LedgerRef::for_state(&state, 2))
        }

        fn client(&self, config: &MemberConfig) -> DirectorySyncClient {
            let (endpoint, _inbox) = self.network.register(self.member.clone());
            DirectorySyncClient::new(
                config,
                Arc::new(MembershipCache::new(self.bno.clone())),
                endpoint,
                Arc::new(self.resolver.clone()),
                Arc::new(self.clock.clone()),
            )
        }

        /// Authority stub answering every sync with `response` and counting calls.
        fn serve(&self, response: MembershipResponse) -> Arc<AtomicUsize> {
            let (endpoint, mut inbox) = self.network.register(self.bno.clone());
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = calls.clone();
            tokio::spawn(async move {
                while let Some(Inbound::Request {
                    from,
                    correlation_id,
                    ..
                }) = inbox.recv().await
                {
                    counter.fetch_add(1, Ordering::SeqCst);
                    endpoint
                        .respond(&from, correlation_id, response.clone())
                        .await
                        .unwrap();
                }
            });
            calls
        }
    }

    #[tokio::test]
    async fn test_fresh_cache_is_served_without_round_trip() {
        let fx = Fixture::new();
        let calls = fx.serve(MembershipResponse::Directory {
            records: vec![fx.record(&fx.member, MembershipStatus::Active)],
        });
        let client = fx.client(&MemberConfig::default());

        let first = client.memberships(false, true).await.unwrap();
        let second = client.memberships(false, true).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        client.memberships(true, true).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_interval_expires_cache() {
        let fx = Fixture::new();
        let calls = fx.serve(MembershipResponse::Directory { records: vec![] });
        let config = MemberConfig {
            cache_refresh_interval_ms: Some(500),
            ..MemberConfig::default()
        };
        let client = fx.client(&config);

        client.memberships(false, true).await.unwrap();
        fx.clock.advance_ms(499);
        client.memberships(false, true).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        fx.clock.advance_ms(1);
        client.memberships(false, true).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rejection_leaves_cache_untouched() {
        let fx = Fixture::new();
        fx.serve(MembershipResponse::Rejected(MembershipError::not_a_member(
            &fx.member,
        )));
        let client = fx.client(&MemberConfig::default());

        let err = client.memberships(true, true).await.unwrap_err();
        assert_eq!(err, MembershipError::not_a_member(&fx.member));
        assert!(client.cache().last_full_sync_at().is_none());
    }

    #[tokio::test]
    async fn test_silent_authority_surfaces_timeout() {
        let fx = Fixture::new();
        // Registered, so requests are queued, but nobody ever answers.
        let (_endpoint, _inbox) = fx.network.register(fx.bno.clone());
        let config = MemberConfig {
            request_timeout_ms: 20,
            ..MemberConfig::default()
        };
        let client = fx.client(&config);

        let err = client.memberships(true, true).await.unwrap_err();
        assert_eq!(
            err,
            MembershipError::Transport(TransportError::Timeout {
                peer: fx.bno.clone(),
                timeout_ms: 20,
            })
        );
        assert!(client.cache().last_full_sync_at().is_none());
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_reply_is_protocol_error() {
        let fx = Fixture::new();
        fx.serve(MembershipResponse::Acknowledged);
        let client = fx.client(&MemberConfig::default());

        assert!(matches!(
            client.memberships(true, true).await,
            Err(MembershipError::UnexpectedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_unresolvable_members_are_filtered_on_pull_and_read() {
        let fx = Fixture::new();
        let ghost = Party::new(
            PartyName::parse("O=Ghost,L=Paris,C=FR").unwrap(),
            bnms_core::PartyId::new_from_entropy([7u8; 32]),
        );
        let departing = fx
            .resolver
            .register(PartyName::parse("O=Member2,L=London,C=GB").unwrap());
        fx.serve(MembershipResponse::Directory {
            records: vec![
                fx.record(&fx.member, MembershipStatus::Active),
                fx.record(&ghost, MembershipStatus::Active),
                fx.record(&departing, MembershipStatus::Active),
            ],
        });
        let client = fx.client(&MemberConfig::default());

        let filtered = client.memberships(true, true).await.unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(!filtered.contains_key(&ghost));

        // Leaves the network map after the pull: hidden on read, kept in cache.
        fx.resolver.remove(&departing.name);
        let visible = client.memberships(false, true).await.unwrap();
        assert!(!visible.contains_key(&departing));
        assert!(client.cache().get(&departing).is_some());
        assert!(client
            .memberships(false, false)
            .await
            .unwrap()
            .contains_key(&departing));

        let unfiltered = client.memberships(true, false).await.unwrap();
        assert_eq!(unfiltered.len(), 3);
    }
}

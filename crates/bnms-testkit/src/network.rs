//! In-process business network
//!
//! [`TestNetwork`] wires one authority and any number of participants over
//! the in-memory transport, with a shared network map and a simulated clock.
//! Every participant whitelists the authority; none is a member until it
//! requests and is activated.

use crate::fixtures::{member_name, party_name, AUTHORITY_NAME};
use bnms_authority::AuthorityNode;
use bnms_core::{MembershipMetadata, MembershipRecord, MembershipResult, NodeConfig, Party};
use bnms_effects::{InMemoryNetwork, MemoryMembershipStore, NetworkMapResolver, SimulatedTimeHandler};
use bnms_member::MemberNode;
use bnms_versions::{MemoryVersionStore, VersionReportingService};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Builder for [`TestNetwork`].
#[derive(Debug, Clone)]
pub struct TestNetworkBuilder {
    participants: usize,
    config: NodeConfig,
    start_ms: u64,
}

impl Default for TestNetworkBuilder {
    fn default() -> Self {
        Self {
            participants: 0,
            config: NodeConfig::default(),
            start_ms: 1_000,
        }
    }
}

impl TestNetworkBuilder {
    /// Number of participants to start
    pub fn participants(mut self, count: usize) -> Self {
        self.participants = count;
        self
    }

    /// Base configuration for every node
    pub fn config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }

    /// Toggle authority pushes
    pub fn notifications(mut self, enabled: bool) -> Self {
        self.config.authority.notifications_enabled = enabled;
        self
    }

    /// Initial simulated time
    pub fn start_ms(mut self, start_ms: u64) -> Self {
        self.start_ms = start_ms;
        self
    }

    /// Start the authority and the participants. Must run inside a tokio
    /// runtime.
    pub fn build(self) -> TestNetwork {
        let network = InMemoryNetwork::new();
        let resolver = NetworkMapResolver::new();
        let store = MemoryMembershipStore::new();
        let clock = SimulatedTimeHandler::new(self.start_ms);

        let mut config = self.config;
        if config.member.authority_whitelist.is_empty() {
            config.member.authority_whitelist = vec![AUTHORITY_NAME.to_string()];
        }

        let authority_party = resolver.register(party_name(AUTHORITY_NAME));
        let (endpoint, inbox) = network.register(authority_party);
        let versions = VersionReportingService::new(
            Arc::new(MemoryVersionStore::new()),
            Arc::new(clock.clone()),
        );
        let authority = Arc::new(AuthorityNode::new(
            &config.authority,
            Arc::new(store.clone()),
            endpoint,
            versions,
        ));
        let tasks = vec![authority.clone().spawn(inbox)];

        let mut test_network = TestNetwork {
            network,
            resolver,
            store,
            clock,
            config,
            authority,
            participants: Vec::new(),
            tasks,
        };
        for index in 1..=self.participants {
            test_network.add_participant(&member_name(index).to_string());
        }
        test_network
    }
}

/// Authority plus participants over one in-memory network.
pub struct TestNetwork {
    /// Transport shared by every node
    pub network: InMemoryNetwork,
    /// Network map shared by every node
    pub resolver: NetworkMapResolver,
    /// The authority's record store
    pub store: MemoryMembershipStore,
    /// Clock shared by every node
    pub clock: SimulatedTimeHandler,
    /// Effective configuration
    pub config: NodeConfig,
    /// Authority node
    pub authority: Arc<AuthorityNode>,
    participants: Vec<Arc<MemberNode>>,
    tasks: Vec<JoinHandle<()>>,
}

impl TestNetwork {
    /// Start building a network
    pub fn builder() -> TestNetworkBuilder {
        TestNetworkBuilder::default()
    }

    /// Authority identity
    pub fn authority_party(&self) -> &Party {
        self.authority.party()
    }

    /// All participants, in start order
    pub fn participants(&self) -> &[Arc<MemberNode>] {
        &self.participants
    }

    /// Participant at `index` (0-based)
    pub fn participant(&self, index: usize) -> &Arc<MemberNode> {
        &self.participants[index]
    }

    /// Identity of the participant at `index`
    pub fn party(&self, index: usize) -> Party {
        self.participants[index].party().clone()
    }

    /// Register a new participant on the network map and transport.
    pub fn add_participant(&mut self, name: &str) -> Arc<MemberNode> {
        let party = self.resolver.register(party_name(name));
        let (endpoint, inbox) = self.network.register(party);
        let node = Arc::new(MemberNode::new(
            self.config.member.clone(),
            endpoint,
            Arc::new(self.resolver.clone()),
            Arc::new(self.clock.clone()),
        ));
        self.tasks.push(node.clone().spawn(inbox));
        self.participants.push(node.clone());
        node
    }

    /// Participant at `index` requests membership over the network.
    pub async fn request(
        &self,
        index: usize,
        metadata: MembershipMetadata,
    ) -> MembershipResult<MembershipRecord> {
        self.participant(index)
            .request_membership(self.authority_party(), metadata)
            .await
    }

    /// Request and activate the participant at `index`.
    pub async fn onboard(
        &self,
        index: usize,
        metadata: MembershipMetadata,
    ) -> MembershipResult<MembershipRecord> {
        self.request(index, metadata).await?;
        self.authority.service().activate(&self.party(index)).await
    }

    /// Onboard every participant with the same metadata.
    pub async fn onboard_all(&self, metadata: MembershipMetadata) -> MembershipResult<()> {
        for index in 0..self.participants.len() {
            self.onboard(index, metadata.clone()).await?;
        }
        Ok(())
    }

    /// Pull the directory for the participant at `index`.
    pub async fn sync(
        &self,
        index: usize,
        force_full_refresh: bool,
    ) -> MembershipResult<bnms_core::Directory> {
        self.participant(index)
            .memberships(self.authority_party(), force_full_refresh)
            .await
    }

    /// Let spawned node tasks drain their inboxes.
    pub async fn settle(&self) {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }
}

impl Drop for TestNetwork {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

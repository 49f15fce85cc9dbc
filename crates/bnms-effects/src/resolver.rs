//! Network map resolver
//!
//! Holds the name to identity bindings a network map service would publish.
//! Parties that leave the network are removed; a name registered again gets
//! a fresh identity, so records pinned to the old identity stop resolving.

use async_trait::async_trait;
use bnms_core::effects::IdentityResolverEffects;
use bnms_core::{Party, PartyId, PartyName};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory network map. Clones share the same bindings.
#[derive(Debug, Clone, Default)]
pub struct NetworkMapResolver {
    entries: Arc<RwLock<HashMap<PartyName, Party>>>,
}

impl NetworkMapResolver {
    /// Create an empty network map
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a fresh identity and return it.
    pub fn register(&self, name: PartyName) -> Party {
        let party = Party::new(name, PartyId::from_uuid(Uuid::new_v4()));
        self.insert(party.clone());
        party
    }

    /// Publish an existing identity, replacing any binding for its name.
    pub fn insert(&self, party: Party) {
        self.entries.write().insert(party.name.clone(), party);
    }

    /// Remove a name from the map. Returns the identity it was bound to.
    pub fn remove(&self, name: &PartyName) -> Option<Party> {
        self.entries.write().remove(name)
    }

    /// All published identities
    pub fn parties(&self) -> Vec<Party> {
        let mut parties: Vec<Party> = self.entries.read().values().cloned().collect();
        parties.sort();
        parties
    }
}

#[async_trait]
impl IdentityResolverEffects for NetworkMapResolver {
    async fn resolve(&self, name: &PartyName) -> Option<Party> {
        self.entries.read().get(name).cloned()
    }
}

//! Identity resolution interface

use crate::identifiers::{Party, PartyName};
use async_trait::async_trait;

/// Maps logical names to reachable, verified identities.
#[async_trait]
pub trait IdentityResolverEffects: Send + Sync {
    /// Resolve a name, or `None` if it is not known on the network.
    async fn resolve(&self, name: &PartyName) -> Option<Party>;

    /// Whether `party` is still the identity its name resolves to.
    async fn is_resolvable(&self, party: &Party) -> bool {
        self.resolve(&party.name).await.as_ref() == Some(party)
    }
}

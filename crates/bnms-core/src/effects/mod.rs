//! Effect traits for external collaborators
//!
//! The membership service reaches the outside world only through these
//! traits. Production and in-memory handlers live in `bnms-effects`.
//!
//! - [`MembershipStoreEffects`]: authoritative, serializable record store
//! - [`IdentityResolverEffects`]: name to identity lookup
//! - [`PhysicalTimeEffects`]: wall-clock time for cache timestamps
//! - [`TransportEffects`]: request/response and push delivery

pub mod resolver;
pub mod store;
pub mod time;
pub mod transport;

pub use resolver::IdentityResolverEffects;
pub use store::MembershipStoreEffects;
pub use time::{PhysicalTime, PhysicalTimeEffects};
pub use transport::TransportEffects;

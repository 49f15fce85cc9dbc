//! BNMS Member: Directory Cache, Sync and Verification
//!
//! Member-side half of the membership service:
//!
//! - `cache` - per-authority replica of the directory
//! - `sync` - pulls the directory, honouring staleness and filtering
//! - `guard` - counterparty checks against the cache
//! - `node` - whitelist, protocol initiators and the delta listener

#![forbid(unsafe_code)]

pub mod cache;
pub mod guard;
pub mod node;
pub mod sync;

pub use cache::{CachedEntry, MembershipCache};
pub use guard::VerificationGuard;
pub use node::MemberNode;
pub use sync::DirectorySyncClient;

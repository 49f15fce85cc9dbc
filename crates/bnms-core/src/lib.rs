//! BNMS Core: Membership Types and Effect Interfaces
//!
//! Foundation crate for the business network membership service. Every other
//! crate in the workspace builds on the types defined here:
//!
//! - **Identifiers**: [`Party`], [`PartyName`], [`PartyId`]
//! - **Records**: [`MembershipRecord`] and its lifecycle [`MembershipStatus`]
//! - **Errors**: [`MembershipError`] plus the collaborator errors it wraps
//! - **Effects**: store, identity resolver, clock and transport traits
//! - **Messages**: the request/response/delta protocol and its wire codec
//! - **Config**: [`NodeConfig`] loaded from TOML and `BNMS_*` variables
//!
//! # Design Principles
//!
//! - Effect traits describe external collaborators only; handlers live in
//!   `bnms-effects` and in test harnesses.
//! - Records are replaced whole, never patched field by field.
//! - Errors are serializable so a rejection can cross the wire unchanged.

#![forbid(unsafe_code)]

pub mod config;
pub mod effects;
pub mod errors;
pub mod identifiers;
pub mod messages;
pub mod record;

pub use config::{AuthorityConfig, MemberConfig, NodeConfig};
pub use errors::{
    ConfigError, MembershipError, MembershipResult, StoreError, StoreResult, TransportError,
    TransportResult,
};
pub use identifiers::{IdentifierError, Party, PartyId, PartyName};
pub use record::{
    Directory, LedgerRef, MembershipMetadata, MembershipOperation, MembershipRecord,
    MembershipState, MembershipStatus, SimpleMembershipMetadata,
};

//! BNMS Authority: Membership Lifecycle and Directory Serving
//!
//! The authority is the only party that writes membership records. This
//! crate holds everything that runs on its side:
//!
//! - `state_machine` - pure lifecycle rules (PENDING, ACTIVE, SUSPENDED)
//! - `notifications` - best-effort delta pushes to active members
//! - `service` - serialized mutations, reads and the directory check
//! - `node` - the request loop answering members over the transport

#![forbid(unsafe_code)]

pub mod node;
pub mod notifications;
pub mod service;
pub mod state_machine;

pub use node::AuthorityNode;
pub use notifications::{DispatchReport, NotificationDispatcher};
pub use service::{AuthorityService, CommandOutcome};
pub use state_machine::{evaluate, is_legal_edge, MembershipCommand, Transition};

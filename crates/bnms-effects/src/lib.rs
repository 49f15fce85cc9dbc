//! BNMS Effects: Effect Handlers
//!
//! Handlers for the effect traits declared in `bnms_core::effects`:
//!
//! - [`MemoryMembershipStore`]: expected-version record store in memory
//! - [`NetworkMapResolver`]: name registry standing in for a network map
//! - [`SystemTimeHandler`] / [`SimulatedTimeHandler`]: real and test clocks
//! - [`InMemoryNetwork`]: framed request/response and push delivery between
//!   endpoints in one process

#![forbid(unsafe_code)]

pub mod resolver;
pub mod storage;
pub mod time;
pub mod transport;

pub use resolver::NetworkMapResolver;
pub use storage::MemoryMembershipStore;
pub use time::{SimulatedTimeHandler, SystemTimeHandler};
pub use transport::{InMemoryEndpoint, InMemoryNetwork};

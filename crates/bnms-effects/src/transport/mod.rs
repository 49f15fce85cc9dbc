//! Transport handlers

mod memory;

pub use memory::{InMemoryEndpoint, InMemoryNetwork};

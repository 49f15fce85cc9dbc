//! Record store handlers

mod memory;

pub use memory::MemoryMembershipStore;

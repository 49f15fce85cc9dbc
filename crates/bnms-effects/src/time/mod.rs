//! Clock handlers

mod real;
mod simulated;

pub use real::SystemTimeHandler;
pub use simulated::SimulatedTimeHandler;

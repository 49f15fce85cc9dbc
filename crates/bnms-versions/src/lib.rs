//! BNMS Versions: Application Version Reporting
//!
//! Members report which version of each application component they run; the
//! authority keeps the latest report per `(reporter, group, name)` with the
//! time it was received. This is a plain upsert table and the membership
//! core does not depend on it.

#![forbid(unsafe_code)]

pub mod service;
pub mod store;

pub use service::VersionReportingService;
pub use store::{MemoryVersionStore, VersionStoreEffects};

use serde::{Deserialize, Serialize};

/// Maximum length of a reported version string
pub const MAX_VERSION_LENGTH: usize = 20;

/// One reported component version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Component group, e.g. `net.corda`
    pub group: String,
    /// Component name, e.g. `corda-finance`
    pub name: String,
    /// Reported version, e.g. `1.0`
    pub version: String,
    /// When the report was last received (ms since epoch)
    pub last_updated_ms: u64,
}

/// Errors from version reporting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// A required field was empty.
    #[error("version report field {0} is empty")]
    EmptyField(&'static str),

    /// The version string exceeds [`MAX_VERSION_LENGTH`].
    #[error("version {0:?} is longer than {} characters", MAX_VERSION_LENGTH)]
    VersionTooLong(String),

    /// Backend failure.
    #[error("version store error: {0}")]
    Backend(String),
}

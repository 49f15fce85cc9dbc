//! Physical time interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Wall-clock timestamp in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhysicalTime {
    /// Milliseconds since the Unix epoch
    pub ts_ms: u64,
}

impl PhysicalTime {
    /// Timestamp at `ts_ms`
    pub fn from_ms(ts_ms: u64) -> Self {
        Self { ts_ms }
    }

    /// Milliseconds elapsed from `earlier` to `self`, saturating at zero.
    pub fn since(&self, earlier: PhysicalTime) -> u64 {
        self.ts_ms.saturating_sub(earlier.ts_ms)
    }
}

/// Source of wall-clock time.
#[async_trait]
pub trait PhysicalTimeEffects: Send + Sync {
    /// Current time
    async fn physical_time(&self) -> PhysicalTime;
}

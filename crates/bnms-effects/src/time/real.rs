//! System clock handler

use async_trait::async_trait;
use bnms_core::effects::{PhysicalTime, PhysicalTimeEffects};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeHandler;

impl SystemTimeHandler {
    /// Create a new system clock handler
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhysicalTimeEffects for SystemTimeHandler {
    #[allow(clippy::disallowed_methods)]
    async fn physical_time(&self) -> PhysicalTime {
        let ts_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        PhysicalTime::from_ms(ts_ms)
    }
}

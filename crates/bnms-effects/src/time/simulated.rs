//! Simulated clock handler for deterministic tests

use async_trait::async_trait;
use bnms_core::effects::{PhysicalTime, PhysicalTimeEffects};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTimeHandler {
    now_ms: Arc<AtomicU64>,
}

impl SimulatedTimeHandler {
    /// Clock starting at `start_ms`
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Move the clock forward
    pub fn advance_ms(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Set the clock to an absolute time
    pub fn set_ms(&self, ts_ms: u64) {
        self.now_ms.store(ts_ms, Ordering::SeqCst);
    }

    /// Current simulated time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhysicalTimeEffects for SimulatedTimeHandler {
    async fn physical_time(&self) -> PhysicalTime {
        PhysicalTime::from_ms(self.now_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_time() {
        let clock = SimulatedTimeHandler::new(1_000);
        let other = clock.clone();
        clock.advance_ms(500);
        assert_eq!(other.physical_time().await, PhysicalTime::from_ms(1_500));
        other.set_ms(10);
        assert_eq!(clock.now_ms(), 10);
    }
}

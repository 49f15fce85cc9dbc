//! Version store interface and in-memory handler

use crate::{VersionError, VersionInfo};
use async_trait::async_trait;
use bnms_core::Party;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Upsert table keyed by `(reporter, group, name)`.
#[async_trait]
pub trait VersionStoreEffects: Send + Sync {
    /// Insert or replace the row for `(reporter, info.group, info.name)`.
    async fn upsert(&self, reporter: &Party, info: VersionInfo) -> Result<(), VersionError>;

    /// All rows grouped by reporter.
    async fn all(&self) -> Result<BTreeMap<Party, Vec<VersionInfo>>, VersionError>;

    /// Rows reported by one party.
    async fn for_reporter(&self, reporter: &Party) -> Result<Vec<VersionInfo>, VersionError>;
}

type RowKey = (Party, String, String);

/// In-memory version table. Clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryVersionStore {
    rows: Arc<RwLock<BTreeMap<RowKey, VersionInfo>>>,
}

impl MemoryVersionStore {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VersionStoreEffects for MemoryVersionStore {
    async fn upsert(&self, reporter: &Party, info: VersionInfo) -> Result<(), VersionError> {
        let key = (reporter.clone(), info.group.clone(), info.name.clone());
        self.rows.write().await.insert(key, info);
        Ok(())
    }

    async fn all(&self) -> Result<BTreeMap<Party, Vec<VersionInfo>>, VersionError> {
        let rows = self.rows.read().await;
        let mut grouped: BTreeMap<Party, Vec<VersionInfo>> = BTreeMap::new();
        for ((reporter, _, _), info) in rows.iter() {
            grouped
                .entry(reporter.clone())
                .or_default()
                .push(info.clone());
        }
        Ok(grouped)
    }

    async fn for_reporter(&self, reporter: &Party) -> Result<Vec<VersionInfo>, VersionError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|((owner, _, _), _)| owner == reporter)
            .map(|(_, info)| info.clone())
            .collect())
    }
}

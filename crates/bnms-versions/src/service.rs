//! Version reporting service

use crate::store::VersionStoreEffects;
use crate::{VersionError, VersionInfo, MAX_VERSION_LENGTH};
use bnms_core::effects::PhysicalTimeEffects;
use bnms_core::Party;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Validates reports, stamps them and writes them to the version store.
pub struct VersionReportingService {
    store: Arc<dyn VersionStoreEffects>,
    clock: Arc<dyn PhysicalTimeEffects>,
}

impl VersionReportingService {
    /// Create a service over a store and a clock
    pub fn new(store: Arc<dyn VersionStoreEffects>, clock: Arc<dyn PhysicalTimeEffects>) -> Self {
        Self { store, clock }
    }

    /// Record that `reporter` runs `version` of `group:name`.
    pub async fn report(
        &self,
        reporter: &Party,
        group: &str,
        name: &str,
        version: &str,
    ) -> Result<VersionInfo, VersionError> {
        if group.trim().is_empty() {
            return Err(VersionError::EmptyField("group"));
        }
        if name.trim().is_empty() {
            return Err(VersionError::EmptyField("name"));
        }
        if version.trim().is_empty() {
            return Err(VersionError::EmptyField("version"));
        }
        if version.chars().count() > MAX_VERSION_LENGTH {
            return Err(VersionError::VersionTooLong(version.to_string()));
        }

        let info = VersionInfo {
            group: group.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            last_updated_ms: self.clock.physical_time().await.ts_ms,
        };
        self.store.upsert(reporter, info.clone()).await?;

        tracing::info!(
            reporter = %reporter,
            group = %info.group,
            name = %info.name,
            version = %info.version,
            "version reported"
        );
        Ok(info)
    }

    /// Every report, grouped by reporter.
    pub async fn versions(&self) -> Result<BTreeMap<Party, Vec<VersionInfo>>, VersionError> {
        self.store.all().await
    }

    /// Reports of a single party.
    pub async fn versions_for(&self, reporter: &Party) -> Result<Vec<VersionInfo>, VersionError> {
        self.store.for_reporter(reporter).await
    }
}

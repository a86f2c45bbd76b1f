//! Collection mirroring: export to the backup table, import back, health-driven recovery.

mod exporter;
mod health;
mod importer;

#[cfg(test)]
pub(crate) mod test_support;

pub use exporter::{ExportResult, export_collection_to_store};
pub use health::{
    HealthCycle, HealthStatus, backup_row_count, check_collection_health,
    current_recovery_destination, recovery_destination, run_health_cycle,
};
pub use importer::{ImportResult, import_store_to_collection};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tether_store::{BackupStore, BackupStoreError, TableName, VectorStore, VectorStoreError};

use crate::config::{Config, RecoveryNaming};

/// Per-process mirror settings derived from [`Config`].
#[derive(Debug, Clone)]
pub struct MirrorSettings {
    pub source_collection: String,
    pub backup_table: TableName,
    pub recovery_collection: String,
    pub recovery_naming: RecoveryNaming,
    pub import_batch_size: usize,
    pub vector_store_timeout: Duration,
    pub database_timeout: Duration,
}

impl MirrorSettings {
    /// # Errors
    ///
    /// Returns an error if the backup table name is not a valid identifier.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let backup_table =
            TableName::parse(&config.mirror.backup_table).context("mirror.backup_table")?;
        Ok(Self {
            source_collection: config.mirror.source_collection.clone(),
            backup_table,
            recovery_collection: config.mirror.recovery_collection.clone(),
            recovery_naming: config.mirror.recovery_naming,
            import_batch_size: config.mirror.import_batch_size.max(1),
            vector_store_timeout: Duration::from_secs(config.timeouts.vector_store_seconds),
            database_timeout: Duration::from_secs(config.timeouts.database_seconds),
        })
    }
}

/// Store handles and settings shared by every mirror operation.
///
/// Built once at startup and passed explicitly; holds no state across runs.
pub struct MirrorContext {
    vector_store: Arc<dyn VectorStore>,
    backup_store: Arc<dyn BackupStore>,
    settings: MirrorSettings,
}

impl MirrorContext {
    #[must_use]
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        backup_store: Arc<dyn BackupStore>,
        settings: MirrorSettings,
    ) -> Self {
        Self {
            vector_store,
            backup_store,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &MirrorSettings {
        &self.settings
    }

    #[must_use]
    pub fn vector_store(&self) -> &dyn VectorStore {
        self.vector_store.as_ref()
    }

    #[must_use]
    pub fn backup_store(&self) -> &dyn BackupStore {
        self.backup_store.as_ref()
    }

    /// Run a vector-store call under the configured per-call timeout.
    pub(crate) async fn vector_call<T>(
        &self,
        fut: impl Future<Output = Result<T, VectorStoreError>>,
    ) -> Result<T, VectorStoreError> {
        let limit = self.settings.vector_store_timeout;
        tokio::time::timeout(limit, fut)
            .await
            .unwrap_or(Err(VectorStoreError::Timeout(limit)))
    }

    /// Run a backup-store call under the configured per-call timeout.
    pub(crate) async fn backup_call<T>(
        &self,
        fut: impl Future<Output = Result<T, BackupStoreError>>,
    ) -> Result<T, BackupStoreError> {
        let limit = self.settings.database_timeout;
        tokio::time::timeout(limit, fut)
            .await
            .unwrap_or(Err(BackupStoreError::Timeout(limit)))
    }
}

impl std::fmt::Debug for MirrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

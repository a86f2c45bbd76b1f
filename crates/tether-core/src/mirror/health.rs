use chrono::{DateTime, Utc};
use tether_store::BackupStoreError;

use super::{MirrorContext, MirrorSettings, import_store_to_collection};
use crate::config::RecoveryNaming;
use crate::error::ImportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub collection: String,
    pub reachable: bool,
    pub detail: Option<String>,
}

/// Outcome of one health-check cycle.
#[derive(Debug)]
pub enum HealthCycle {
    Healthy,
    RecoveryComplete {
        destination: String,
        items_restored: usize,
    },
    RecoveryFailed {
        destination: String,
        error: ImportError,
    },
}

/// Probe whether `collection` can be reached. Never fails; every error
/// becomes an unreachable status carrying the error text.
pub async fn check_collection_health(ctx: &MirrorContext, collection: &str) -> HealthStatus {
    let probe = ctx
        .vector_call(ctx.vector_store().collection_exists(collection))
        .await;
    let (reachable, detail) = match probe {
        Ok(true) => (true, None),
        Ok(false) => (false, Some("collection not found".to_owned())),
        Err(e) => (false, Some(e.to_string())),
    };
    HealthStatus {
        collection: collection.to_owned(),
        reachable,
        detail,
    }
}

/// Number of rows in the backup table, under the database call timeout.
///
/// # Errors
///
/// Returns the backup store error, or [`BackupStoreError::Timeout`].
pub async fn backup_row_count(ctx: &MirrorContext) -> Result<u64, BackupStoreError> {
    let table = &ctx.settings().backup_table;
    ctx.backup_call(ctx.backup_store().count(table)).await
}

/// Name of the collection a recovery started at `now` restores into.
#[must_use]
pub fn recovery_destination(settings: &MirrorSettings, now: DateTime<Utc>) -> String {
    match settings.recovery_naming {
        RecoveryNaming::Fixed => settings.recovery_collection.clone(),
        RecoveryNaming::Timestamped => format!(
            "{}_{}",
            settings.recovery_collection,
            now.format("%Y%m%dT%H%M%SZ")
        ),
    }
}

/// Recovery destination for an attempt starting now.
#[must_use]
pub fn current_recovery_destination(settings: &MirrorSettings) -> String {
    recovery_destination(settings, Utc::now())
}

/// Probe the source collection and, if it is unreachable, restore the backup
/// into the recovery destination. At most one import is attempted per cycle.
pub async fn run_health_cycle(ctx: &MirrorContext) -> HealthCycle {
    let settings = ctx.settings();
    let status = check_collection_health(ctx, &settings.source_collection).await;
    if status.reachable {
        tracing::info!(collection = %status.collection, "collection is healthy");
        return HealthCycle::Healthy;
    }

    let destination = current_recovery_destination(settings);
    tracing::warn!(
        collection = %status.collection,
        detail = status.detail.as_deref().unwrap_or_default(),
        destination = %destination,
        "collection unreachable, starting recovery"
    );

    match import_store_to_collection(ctx, &settings.backup_table, &destination).await {
        Ok(result) => {
            tracing::info!(
                destination = %destination,
                items = result.items_restored,
                "recovery complete"
            );
            HealthCycle::RecoveryComplete {
                destination,
                items_restored: result.items_restored,
            }
        }
        Err(error) => {
            tracing::error!(destination = %destination, "recovery failed: {error}");
            HealthCycle::RecoveryFailed { destination, error }
        }
    }
}

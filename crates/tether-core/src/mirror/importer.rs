use tether_store::{CollectionItem, TableName, VectorStoreError, decode_record};

use super::MirrorContext;
use crate::error::ImportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportResult {
    pub items_restored: usize,
}

/// Restore every record of `backup_table` into a new collection named
/// `destination`.
///
/// The whole backup is decoded and checked before the destination is created,
/// so a corrupt backup never leaves a partial collection behind. An empty
/// backup restores nothing and creates nothing.
///
/// # Errors
///
/// See [`ImportError`]. A failure after some batches were inserted is reported
/// as [`ImportError::Insert`] with the number already restored.
pub async fn import_store_to_collection(
    ctx: &MirrorContext,
    backup_table: &TableName,
    destination: &str,
) -> Result<ImportResult, ImportError> {
    let records = ctx
        .backup_call(ctx.backup_store().fetch_records(backup_table))
        .await
        .map_err(|source| ImportError::Backup {
            table: backup_table.to_string(),
            source,
        })?;

    let items = records
        .iter()
        .map(decode_record)
        .collect::<Result<Vec<CollectionItem>, _>>()?;
    check_dimensions(&items)?;

    if items.is_empty() {
        tracing::info!(table = %backup_table, "backup table is empty, nothing to import");
        return Ok(ImportResult { items_restored: 0 });
    }

    let vector_err = |source| ImportError::VectorStore {
        collection: destination.to_owned(),
        source,
    };
    let exists = ctx
        .vector_call(ctx.vector_store().collection_exists(destination))
        .await
        .map_err(vector_err)?;
    if exists {
        return Err(ImportError::CollectionAlreadyExists(destination.to_owned()));
    }
    ctx.vector_call(ctx.vector_store().create_collection(destination))
        .await
        .map_err(|e| match e {
            VectorStoreError::CollectionAlreadyExists(_) => {
                ImportError::CollectionAlreadyExists(destination.to_owned())
            }
            other => vector_err(other),
        })?;

    let batch_size = ctx.settings().import_batch_size.max(1);
    let total = items.len();
    let mut restored = 0;
    let mut remaining = items.into_iter();
    loop {
        let batch: Vec<CollectionItem> = remaining.by_ref().take(batch_size).collect();
        if batch.is_empty() {
            break;
        }
        let len = batch.len();
        ctx.vector_call(ctx.vector_store().add_items(destination, batch))
            .await
            .map_err(|source| ImportError::Insert {
                collection: destination.to_owned(),
                restored,
                source,
            })?;
        restored += len;
        tracing::debug!(collection = destination, restored, total, "inserted batch");
    }

    tracing::info!(
        table = %backup_table,
        collection = destination,
        items = restored,
        "imported backup into collection"
    );
    Ok(ImportResult {
        items_restored: restored,
    })
}

fn check_dimensions(items: &[CollectionItem]) -> Result<(), ImportError> {
    let Some(first) = items.first() else {
        return Ok(());
    };
    let expected = first.embedding.len();
    match items.iter().find(|i| i.embedding.len() != expected) {
        Some(bad) => Err(ImportError::DimensionMismatch {
            id: bad.id.clone(),
            expected,
            found: bad.embedding.len(),
        }),
        None => Ok(()),
    }
}

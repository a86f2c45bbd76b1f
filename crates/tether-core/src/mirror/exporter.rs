use std::collections::BTreeMap;

use tether_store::{BackupRecord, TableName, VectorStoreError, encode_item};

use super::MirrorContext;
use crate::error::ExportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportResult {
    pub items_written: usize,
}

/// Copy every item of `source_collection` into `backup_table`.
///
/// The source collection is only read. All items are encoded before anything
/// is written, and the write is a single transaction.
///
/// # Errors
///
/// See [`ExportError`]; on any error nothing has been committed.
pub async fn export_collection_to_store(
    ctx: &MirrorContext,
    source_collection: &str,
    backup_table: &TableName,
) -> Result<ExportResult, ExportError> {
    let items = ctx
        .vector_call(ctx.vector_store().get_all(source_collection))
        .await
        .map_err(|e| match e {
            VectorStoreError::CollectionNotFound(_) => {
                ExportError::CollectionNotFound(source_collection.to_owned())
            }
            source => ExportError::VectorStore {
                collection: source_collection.to_owned(),
                source,
            },
        })?;

    if items.is_empty() {
        tracing::info!(
            collection = source_collection,
            table = %backup_table,
            "source collection is empty, nothing to export"
        );
        return Ok(ExportResult { items_written: 0 });
    }

    let fetched = items.len();
    let mut by_id = BTreeMap::new();
    for item in items {
        by_id.insert(item.id.clone(), item);
    }
    if by_id.len() < fetched {
        tracing::warn!(
            collection = source_collection,
            duplicates = fetched - by_id.len(),
            "collapsed duplicate ids in source collection"
        );
    }

    let records = by_id
        .values()
        .map(encode_item)
        .collect::<Result<Vec<BackupRecord>, _>>()?;

    ctx.backup_call(ctx.backup_store().upsert_records(backup_table, &records))
        .await
        .map_err(|source| ExportError::Backup {
            table: backup_table.to_string(),
            source,
        })?;

    tracing::info!(
        collection = source_collection,
        table = %backup_table,
        items = records.len(),
        "exported collection to backup table"
    );
    Ok(ExportResult {
        items_written: records.len(),
    })
}

mod postgres;
mod sqlite;

use std::fmt;

use crate::error::BackupStoreError;
use crate::types::BackupRecord;
use crate::vector_store::BoxFuture;

pub use postgres::{PgBackupStore, PgConnectSettings};
pub use sqlite::SqliteBackupStore;

const MAX_IDENTIFIER_LEN: usize = 63;

/// A validated SQL identifier naming the backup table.
///
/// Table names cannot be bound as query parameters, so they are checked once
/// here and quoted wherever they are interpolated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// Validate a table name.
    ///
    /// # Errors
    ///
    /// Returns [`BackupStoreError::InvalidTableName`] unless the name matches
    /// `[A-Za-z_][A-Za-z0-9_]*` and fits in 63 bytes.
    pub fn parse(name: &str) -> Result<Self, BackupStoreError> {
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid_start && valid_rest && name.len() <= MAX_IDENTIFIER_LEN {
            Ok(Self(name.to_owned()))
        } else {
            Err(BackupStoreError::InvalidTableName(name.to_owned()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for interpolation into SQL.
    pub(crate) fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable relational mirror of a vector collection.
///
/// Every method acquires a pooled connection for its own duration only; the
/// backup table is created on demand.
pub trait BackupStore: Send + Sync {
    /// Check that a connection can be acquired and used.
    fn ping(&self) -> BoxFuture<'_, Result<(), BackupStoreError>>;

    /// Create the backup table if it does not exist.
    fn ensure_table<'a>(&'a self, table: &'a TableName)
    -> BoxFuture<'a, Result<(), BackupStoreError>>;

    /// Upsert records keyed by id in a single transaction. Returns rows written.
    fn upsert_records<'a>(
        &'a self,
        table: &'a TableName,
        records: &'a [BackupRecord],
    ) -> BoxFuture<'a, Result<u64, BackupStoreError>>;

    /// Read every record, ordered by id.
    fn fetch_records<'a>(
        &'a self,
        table: &'a TableName,
    ) -> BoxFuture<'a, Result<Vec<BackupRecord>, BackupStoreError>>;

    /// Number of rows in the backup table.
    fn count<'a>(&'a self, table: &'a TableName) -> BoxFuture<'a, Result<u64, BackupStoreError>>;
}

type RecordRow = (String, Option<String>, Option<String>, Option<String>);

fn record_from_row((id, embedding, metadata, document): RecordRow) -> BackupRecord {
    BackupRecord {
        id,
        embedding,
        metadata,
        document,
    }
}

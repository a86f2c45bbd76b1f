use tether_store::{BackupStoreError, CodecError, VectorStoreError};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("source collection not found: {0}")]
    CollectionNotFound(String),

    #[error("failed to read collection {collection}: {source}")]
    VectorStore {
        collection: String,
        #[source]
        source: VectorStoreError,
    },

    #[error(transparent)]
    Encode(#[from] CodecError),

    #[error("failed to write backup table {table}: {source}")]
    Backup {
        table: String,
        #[source]
        source: BackupStoreError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read backup table {table}: {source}")]
    Backup {
        table: String,
        #[source]
        source: BackupStoreError,
    },

    #[error(transparent)]
    Decode(#[from] CodecError),

    #[error("record {id} has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("destination collection already exists: {0}")]
    CollectionAlreadyExists(String),

    #[error("vector store error on {collection}: {source}")]
    VectorStore {
        collection: String,
        #[source]
        source: VectorStoreError,
    },

    #[error("insert into {collection} failed after {restored} items: {source}")]
    Insert {
        collection: String,
        restored: usize,
        #[source]
        source: VectorStoreError,
    },
}

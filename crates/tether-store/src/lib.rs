//! Vector-store clients, relational backup stores and the record codec between them.

pub mod backup;
pub mod chroma;
pub mod codec;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod in_memory_store;
pub mod types;
pub mod vector_store;

pub use backup::{BackupStore, PgBackupStore, PgConnectSettings, SqliteBackupStore, TableName};
pub use chroma::{ChromaEndpoint, ChromaStore};
pub use codec::{decode_record, encode_item};
pub use error::{BackupStoreError, CodecError, VectorStoreError};
#[cfg(any(test, feature = "mock"))]
pub use in_memory_store::InMemoryVectorStore;
pub use types::{BackupRecord, CollectionItem, Metadata, MetadataValue};
pub use vector_store::{BoxFuture, VectorStore};

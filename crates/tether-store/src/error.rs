#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("collection not found: {0}")]
    CollectionNotFound(String),
    #[error("collection already exists: {0}")]
    CollectionAlreadyExists(String),
    #[error("request error: {0}")]
    Request(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum BackupStoreError {
    #[error("connection error: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
    #[error("invalid table name {0:?}: expected [A-Za-z_][A-Za-z0-9_]*, at most 63 bytes")]
    InvalidTableName(String),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<sqlx::Error> for BackupStoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Configuration(_)
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Connection(e),
            other => Self::Database(other),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode item {id}: {reason}")]
    Encode { id: String, reason: String },
    #[error("failed to decode record {id}: {reason}")]
    Decode { id: String, reason: String },
}

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tether_store::{
    BackupStore, BoxFuture, CollectionItem, InMemoryVectorStore, SqliteBackupStore, TableName,
    VectorStore, VectorStoreError,
};

use super::{MirrorContext, MirrorSettings};
use crate::config::RecoveryNaming;

pub(crate) fn test_settings() -> MirrorSettings {
    MirrorSettings {
        source_collection: "my_collection".into(),
        backup_table: TableName::parse("chroma_data").unwrap(),
        recovery_collection: "imported_collection".into(),
        recovery_naming: RecoveryNaming::Fixed,
        import_batch_size: 2,
        vector_store_timeout: Duration::from_secs(5),
        database_timeout: Duration::from_secs(5),
    }
}

pub(crate) async fn memory_backup() -> Arc<SqliteBackupStore> {
    Arc::new(
        SqliteBackupStore::open(":memory:", 1, Duration::from_secs(5))
            .await
            .unwrap(),
    )
}

pub(crate) fn context(
    vector_store: Arc<dyn VectorStore>,
    backup_store: Arc<dyn BackupStore>,
) -> MirrorContext {
    MirrorContext::new(vector_store, backup_store, test_settings())
}

pub(crate) fn items_abc() -> Vec<CollectionItem> {
    vec![
        CollectionItem::new("a", vec![0.1, 0.2]),
        CollectionItem::new("b", vec![0.3, 0.4]),
        CollectionItem::new("c", vec![0.5, 0.6]),
    ]
}

/// In-memory store with injectable faults and call counters.
#[derive(Default)]
pub(crate) struct FaultyVectorStore {
    pub inner: InMemoryVectorStore,
    pub fail_probe: bool,
    pub probe_delay: Option<Duration>,
    pub fail_get_all: bool,
    /// Reject any `add_items` call once this many items have been accepted.
    pub accept_items: Option<usize>,
    /// Items returned by `get_all` instead of the stored ones.
    pub get_all_override: Option<Vec<CollectionItem>>,
    pub create_calls: AtomicUsize,
    pub add_calls: AtomicUsize,
    pub accepted: AtomicUsize,
}

impl VectorStore for FaultyVectorStore {
    fn ping(&self) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        self.inner.ping()
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            if let Some(delay) = self.probe_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_probe {
                return Err(VectorStoreError::Connection("connection refused".into()));
            }
            self.inner.collection_exists(&collection).await
        })
    }

    fn create_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_collection(collection)
    }

    fn get_all(
        &self,
        collection: &str,
    ) -> BoxFuture<'_, Result<Vec<CollectionItem>, VectorStoreError>> {
        if self.fail_get_all {
            return Box::pin(async { Err(VectorStoreError::Request("internal error".into())) });
        }
        if let Some(items) = &self.get_all_override {
            let items = items.clone();
            return Box::pin(async move { Ok(items) });
        }
        self.inner.get_all(collection)
    }

    fn add_items(
        &self,
        collection: &str,
        items: Vec<CollectionItem>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.accept_items
            && self.accepted.load(Ordering::SeqCst) + items.len() > limit
        {
            return Box::pin(async { Err(VectorStoreError::Request("quota exceeded".into())) });
        }
        self.accepted.fetch_add(items.len(), Ordering::SeqCst);
        self.inner.add_items(collection, items)
    }
}

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::error::VectorStoreError;
use crate::types::CollectionItem;
use crate::vector_store::{BoxFuture, VectorStore};

struct InMemoryCollection {
    items: BTreeMap<String, CollectionItem>,
}

pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, InMemoryCollection>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Create (or replace) a collection with the given items.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn seed(&self, collection: &str, items: Vec<CollectionItem>) {
        let mut cols = self.collections.write().expect("collections lock poisoned");
        cols.insert(
            collection.to_owned(),
            InMemoryCollection {
                items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
            },
        );
    }

    /// Drop a collection, simulating its loss.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove_collection(&self, collection: &str) {
        let mut cols = self.collections.write().expect("collections lock poisoned");
        cols.remove(collection);
    }

    /// Snapshot of a collection's items ordered by id, or `None` if absent.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn items(&self, collection: &str) -> Option<Vec<CollectionItem>> {
        let cols = self.collections.read().expect("collections lock poisoned");
        cols.get(collection)
            .map(|c| c.items.values().cloned().collect())
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore")
            .finish_non_exhaustive()
    }
}

impl VectorStore for InMemoryVectorStore {
    fn ping(&self) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        Box::pin(async { Ok(()) })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Request(e.to_string()))?;
            Ok(cols.contains_key(&collection))
        })
    }

    fn create_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Request(e.to_string()))?;
            if cols.contains_key(&collection) {
                return Err(VectorStoreError::CollectionAlreadyExists(collection));
            }
            cols.insert(
                collection,
                InMemoryCollection {
                    items: BTreeMap::new(),
                },
            );
            Ok(())
        })
    }

    fn get_all(
        &self,
        collection: &str,
    ) -> BoxFuture<'_, Result<Vec<CollectionItem>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Request(e.to_string()))?;
            let col = cols
                .get(&collection)
                .ok_or(VectorStoreError::CollectionNotFound(collection.clone()))?;
            Ok(col.items.values().cloned().collect())
        })
    }

    fn add_items(
        &self,
        collection: &str,
        items: Vec<CollectionItem>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Request(e.to_string()))?;
            let col = cols
                .get_mut(&collection)
                .ok_or(VectorStoreError::CollectionNotFound(collection.clone()))?;
            for item in items {
                col.items.insert(item.id.clone(), item);
            }
            Ok(())
        })
    }
}

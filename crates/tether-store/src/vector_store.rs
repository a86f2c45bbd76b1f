use std::future::Future;
use std::pin::Pin;

use crate::error::VectorStoreError;
use crate::types::CollectionItem;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Capabilities the mirror needs from a vector database.
pub trait VectorStore: Send + Sync {
    /// Check that the server answers at all, independent of any collection.
    fn ping(&self) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// Lightweight existence probe for a collection.
    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>>;

    /// Create an empty collection.
    ///
    /// Fails with [`VectorStoreError::CollectionAlreadyExists`] instead of
    /// reusing an existing one.
    fn create_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// Read every item of a collection in one bulk call.
    fn get_all(
        &self,
        collection: &str,
    ) -> BoxFuture<'_, Result<Vec<CollectionItem>, VectorStoreError>>;

    /// Insert items into an existing collection.
    fn add_items(
        &self,
        collection: &str,
        items: Vec<CollectionItem>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;
}

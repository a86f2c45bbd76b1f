//! HTTP client for the vector database REST API.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::VectorStoreError;
use crate::types::{CollectionItem, Metadata};
use crate::vector_store::{BoxFuture, VectorStore};

const API_PREFIX: &str = "api/v1/vector_db/collections";

/// Connection settings for [`ChromaStore`].
#[derive(Debug, Clone)]
pub struct ChromaEndpoint {
    pub host: String,
    pub port: u16,
    pub use_ssl: bool,
}

impl ChromaEndpoint {
    /// Base URL for the server; the port is omitted when it is the scheme default.
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        let standard = (self.use_ssl && self.port == 443) || (!self.use_ssl && self.port == 80);
        if standard {
            format!("{scheme}://{}", self.host)
        } else {
            format!("{scheme}://{}:{}", self.host, self.port)
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    ids: Vec<String>,
    #[serde(default)]
    embeddings: Option<Vec<Option<Vec<f32>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Option<Metadata>>>,
    #[serde(default)]
    documents: Option<Vec<Option<String>>>,
}

#[derive(Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
}

pub struct ChromaStore {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for ChromaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromaStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ChromaStore {
    /// Create a client for the given endpoint with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError::Connection`] if the HTTP client cannot be built.
    pub fn new(endpoint: &ChromaEndpoint, timeout: Duration) -> Result<Self, VectorStoreError> {
        Self::with_base_url(endpoint.base_url(), timeout)
    }

    /// Create a client against an explicit base URL.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError::Connection`] if the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, VectorStoreError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(concat!("tether/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VectorStoreError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collections_url(&self) -> String {
        format!("{}/{API_PREFIX}", self.base_url)
    }

    fn collection_url(&self, collection: &str, suffix: &str) -> String {
        format!("{}/{API_PREFIX}/{collection}/{suffix}", self.base_url)
    }

    async fn fetch_embeddings(
        &self,
        collection: &str,
    ) -> Result<EmbeddingsResponse, VectorStoreError> {
        let resp = self
            .client
            .get(self.collection_url(collection, "embeddings"))
            .header("accept", "application/json")
            .send()
            .await
            .map_err(request_error)?;

        match resp.status() {
            StatusCode::NOT_FOUND => {
                return Err(VectorStoreError::CollectionNotFound(collection.to_owned()));
            }
            s if !s.is_success() => {
                return Err(VectorStoreError::Request(format!(
                    "listing collection {collection}: HTTP {s}"
                )));
            }
            _ => {}
        }

        let body = resp.bytes().await.map_err(request_error)?;
        serde_json::from_slice(&body).map_err(|e| VectorStoreError::Serialization(e.to_string()))
    }
}

fn request_error(e: reqwest::Error) -> VectorStoreError {
    if e.is_connect() || e.is_timeout() {
        VectorStoreError::Connection(e.to_string())
    } else {
        VectorStoreError::Request(e.to_string())
    }
}

/// Zip the column-oriented response into items.
fn into_items(resp: EmbeddingsResponse) -> Result<Vec<CollectionItem>, VectorStoreError> {
    let n = resp.ids.len();
    let embeddings = resp.embeddings.unwrap_or_default();
    if embeddings.len() != n {
        return Err(VectorStoreError::Serialization(format!(
            "response has {n} ids but {} embeddings",
            embeddings.len()
        )));
    }
    let mut metadatas = resp.metadatas.unwrap_or_default().into_iter();
    let mut documents = resp.documents.unwrap_or_default().into_iter();

    resp.ids
        .into_iter()
        .zip(embeddings)
        .map(|(id, embedding)| -> Result<CollectionItem, VectorStoreError> {
            let embedding = embedding.ok_or_else(|| {
                VectorStoreError::Serialization(format!("item {id} has no embedding"))
            })?;
            Ok(CollectionItem {
                id,
                embedding,
                metadata: metadatas.next().flatten(),
                document: documents.next().flatten(),
            })
        })
        .collect()
}

impl VectorStore for ChromaStore {
    fn ping(&self) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        Box::pin(async move {
            // Any HTTP answer means the server is up.
            self.client
                .get(format!("{}/", self.base_url))
                .send()
                .await
                .map_err(|e| VectorStoreError::Connection(e.to_string()))?;
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let resp = self
                .client
                .get(self.collection_url(&collection, "embeddings?limit=1"))
                .header("accept", "application/json")
                .send()
                .await
                .map_err(request_error)?;
            match resp.status() {
                s if s.is_success() => Ok(true),
                StatusCode::NOT_FOUND => Ok(false),
                s => Err(VectorStoreError::Request(format!(
                    "probing collection {collection}: HTTP {s}"
                ))),
            }
        })
    }

    fn create_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let resp = self
                .client
                .post(self.collections_url())
                .header("accept", "application/json")
                .json(&CreateCollectionRequest { name: &collection })
                .send()
                .await
                .map_err(request_error)?;
            match resp.status() {
                s if s.is_success() => {
                    tracing::info!(collection = %collection, "created collection");
                    Ok(())
                }
                StatusCode::CONFLICT => Err(VectorStoreError::CollectionAlreadyExists(collection)),
                s => Err(VectorStoreError::Request(format!(
                    "creating collection {collection}: HTTP {s}"
                ))),
            }
        })
    }

    fn get_all(
        &self,
        collection: &str,
    ) -> BoxFuture<'_, Result<Vec<CollectionItem>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let resp = self.fetch_embeddings(&collection).await?;
            tracing::debug!(
                collection = %collection,
                ids = resp.ids.len(),
                "retrieved collection contents"
            );
            into_items(resp)
        })
    }

    fn add_items(
        &self,
        collection: &str,
        items: Vec<CollectionItem>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let resp = self
                .client
                .post(self.collection_url(&collection, "add_embeddings"))
                .header("accept", "application/json")
                .json(&items)
                .send()
                .await
                .map_err(request_error)?;
            match resp.status() {
                s if s.is_success() => Ok(()),
                StatusCode::NOT_FOUND => Err(VectorStoreError::CollectionNotFound(collection)),
                s => {
                    let body = resp.text().await.unwrap_or_default();
                    Err(VectorStoreError::Request(format!(
                        "adding {} items to {collection}: HTTP {s}: {body}",
                        items.len()
                    )))
                }
            }
        })
    }
}

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::VectorBackend;
use crate::chunk::Chunk;
use crate::embeddings::EmbeddingClient;

/// Vector backend talking to Qdrant over its REST API.
///
/// Each instance owns one collection; the collection is created lazily on
/// first upsert and dropped on reset. Point ids are a stable hash of the
/// chunk id, so re-upserting the same chunk overwrites silently.
pub struct QdrantBackend {
    base_url: String,
    collection: String,
    client: reqwest::Client,
    embeddings: EmbeddingClient,
}

#[derive(Serialize)]
struct UpsertPoints {
    points: Vec<Point>,
}

#[derive(Serialize)]
struct Point {
    id: u64,
    vector: Vec<f32>,
    payload: HashMap<String, serde_json::Value>,
}

impl QdrantBackend {
    pub fn new(base_url: String, collection: String, embeddings: EmbeddingClient) -> Self {
        Self {
            base_url,
            collection,
            client: reqwest::Client::new(),
            embeddings,
        }
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let url = format!("{}/collections/{}", self.base_url, self.collection);
        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            return Ok(());
        }

        info!(collection = %self.collection, dimension, "creating collection");
        let create = json!({
            "vectors": { "size": dimension, "distance": "Cosine" }
        });
        let response = self.client.put(&url).json(&create).send().await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to create collection: {body}");
        }
        Ok(())
    }

    fn point_id(chunk_id: &str) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        chunk_id.hash(&mut hasher);
        hasher.finish()
    }
}

#[async_trait]
impl VectorBackend for QdrantBackend {
    async fn reset(&self) -> Result<()> {
        let url = format!("{}/collections/{}", self.base_url, self.collection);
        let response = self.client.delete(&url).send().await?;
        // Deleting a collection that never existed is fine.
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to drop collection: {body}");
        }
        debug!(collection = %self.collection, "collection dropped");
        Ok(())
    }

    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self
            .embeddings
            .embed_batch(&texts)
            .await
            .context("Failed to embed chunks")?;

        let dimension = vectors.first().map(|v| v.len()).unwrap_or(0);
        self.ensure_collection(dimension).await?;

        let points = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let mut payload = HashMap::new();
                payload.insert("chunk_id".to_string(), json!(chunk.chunk_id));
                payload.insert("source".to_string(), json!(chunk.doc_id));
                payload.insert("text".to_string(), json!(chunk.text));
                Point {
                    id: Self::point_id(&chunk.chunk_id),
                    vector,
                    payload,
                }
            })
            .collect();

        let url = format!(
            "{}/collections/{}/points",
            self.base_url, self.collection
        );
        let response = self
            .client
            .put(&url)
            .json(&UpsertPoints { points })
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to upsert points: {body}");
        }

        info!(collection = %self.collection, chunks = chunks.len(), "chunks indexed");
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let vector = self
            .embeddings
            .embed(query)
            .await
            .context("Failed to embed query")?;

        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );
        let body = json!({
            "vector": vector,
            "limit": k,
            "with_payload": true
        });

        let response = self.client.post(&url).json(&body).send().await?;

        // A collection that was never created holds nothing.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Search failed: {body}");
        }

        let result: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse search response")?;

        let points = result["result"]
            .as_array()
            .context("Invalid search response format")?;

        let texts = points
            .iter()
            .filter_map(|p| p["payload"]["text"].as_str())
            .map(str::to_string)
            .collect();

        Ok(texts)
    }
}

pub mod chunk;
pub mod chunker;
pub mod embeddings;
pub mod memory;
pub mod qdrant;

pub use chunk::Chunk;
pub use chunker::{Chunker, ChunkerConfig};
pub use embeddings::EmbeddingClient;
pub use memory::InMemoryBackend;
pub use qdrant::QdrantBackend;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// Number of chunks returned per query unless the caller asks otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// Embedding-backed nearest-neighbor store underneath the retrieval index.
///
/// The contract this crate relies on: identical query text over identical
/// indexed content yields a stable nearest-first ordering, and searching
/// an empty store yields an empty sequence rather than an error.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Drop all previously indexed content.
    async fn reset(&self) -> Result<()>;

    /// Store chunks; duplicate chunk ids overwrite silently.
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()>;

    /// Top-k chunk texts, nearest first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>>;
}

/// Chunks documents and exposes nearest-neighbor retrieval over them.
pub struct RetrievalIndex<B: VectorBackend> {
    backend: B,
    chunker: Chunker,
}

impl<B: VectorBackend> RetrievalIndex<B> {
    pub fn new(backend: B, config: ChunkerConfig) -> Self {
        Self {
            backend,
            chunker: Chunker::new(config),
        }
    }

    /// Drop all indexed chunks. Indexing itself never resets; callers that
    /// want a fresh index reset first.
    pub async fn reset(&self) -> Result<()> {
        self.backend.reset().await
    }

    /// Chunk `text` and store the chunks. Returns how many were indexed.
    pub async fn index_document(&self, text: &str, doc_id: &str) -> Result<usize> {
        let chunks = self.chunker.chunk_text(doc_id, text);
        debug!(doc_id, chunks = chunks.len(), "indexing document");
        self.backend.upsert(&chunks).await?;
        Ok(chunks.len())
    }

    /// Nearest chunks for `text`, best match first.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<String>> {
        self.backend.search(text, k).await
    }
}

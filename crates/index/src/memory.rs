use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::VectorBackend;
use crate::chunk::Chunk;

/// In-process vector backend ranking by token overlap.
///
/// Stands in for Qdrant when no services are running (the retrieval
/// contract only demands a stable nearest-first ordering for identical
/// input, which token overlap satisfies deterministically). Also the
/// backend of choice in tests.
#[derive(Default)]
pub struct InMemoryBackend {
    chunks: Mutex<Vec<Chunk>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn score(query_tokens: &HashSet<String>, text: &str) -> usize {
        let haystack = text.to_lowercase();
        query_tokens
            .iter()
            .filter(|token| haystack.contains(token.as_str()))
            .count()
    }
}

#[async_trait]
impl VectorBackend for InMemoryBackend {
    async fn reset(&self) -> Result<()> {
        let mut chunks = self
            .chunks
            .lock()
            .map_err(|_| anyhow::anyhow!("chunk store poisoned"))?;
        chunks.clear();
        Ok(())
    }

    async fn upsert(&self, new_chunks: &[Chunk]) -> Result<()> {
        let mut chunks = self
            .chunks
            .lock()
            .map_err(|_| anyhow::anyhow!("chunk store poisoned"))?;
        for chunk in new_chunks {
            // Duplicate ids overwrite silently, matching the real backend.
            if let Some(existing) = chunks.iter_mut().find(|c| c.chunk_id == chunk.chunk_id) {
                *existing = chunk.clone();
            } else {
                chunks.push(chunk.clone());
            }
        }
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let query_tokens: HashSet<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let chunks = self
            .chunks
            .lock()
            .map_err(|_| anyhow::anyhow!("chunk store poisoned"))?;

        let mut scored: Vec<(usize, &Chunk)> = chunks
            .iter()
            .map(|c| (Self::score(&query_tokens, &c.text), c))
            .collect();
        // Stable sort keeps insertion order among ties.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, c)| c.text.clone())
            .collect())
    }
}

use std::sync::Arc;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{info, warn};

use extract::KnowledgeGraph;
use index::{RetrievalIndex, VectorBackend};

/// Per-session mutable state: the current graph and the last uploaded text.
#[derive(Default)]
pub struct SessionState {
    pub graph: KnowledgeGraph,
    pub latest_text: String,
}

/// One client's working set: a graph plus a retrieval index, never shared
/// across sessions.
pub struct Session<B: VectorBackend> {
    pub state: Mutex<SessionState>,
    pub retrieval: RetrievalIndex<B>,
}

impl<B: VectorBackend> Session<B> {
    pub fn new(retrieval: RetrievalIndex<B>) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            retrieval,
        }
    }
}

/// Bounded session cache keyed by the opaque client-supplied id.
///
/// Caps the session count and evicts a quarter of the entries when full.
/// Eviction order is arbitrary, which is acceptable for a cache of
/// rebuildable state.
pub struct SessionCache<B: VectorBackend> {
    sessions: DashMap<String, Arc<Session<B>>>,
    max_sessions: usize,
}

impl<B: VectorBackend> SessionCache<B> {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn get_or_create(
        &self,
        session_id: &str,
        make: impl FnOnce() -> Session<B>,
    ) -> Arc<Session<B>> {
        if let Some(existing) = self.sessions.get(session_id) {
            return existing.clone();
        }

        if self.sessions.len() >= self.max_sessions {
            self.evict_quarter();
        }

        info!(session_id, "creating new session");
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(make()))
            .clone()
    }

    fn evict_quarter(&self) {
        let to_remove: Vec<String> = self
            .sessions
            .iter()
            .take((self.max_sessions / 4).max(1))
            .map(|entry| entry.key().clone())
            .collect();
        warn!(evicted = to_remove.len(), "session cache full, evicting");
        for key in to_remove {
            self.sessions.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Stable per-session collection name for the vector store. Hashing keeps
/// arbitrary client ids out of Qdrant's collection namespace.
pub fn collection_name(session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    let digest = hasher.finalize();
    format!("cognigraph_{}", hex::encode(&digest[..8]))
}

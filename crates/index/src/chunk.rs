use serde::{Deserialize, Serialize};

/// One overlapping window of a document, the unit of retrieval.
///
/// Chunks are never updated in place; a fresh index pass replaces them
/// wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Deterministic id: `{doc_id}_{seq}`.
    pub chunk_id: String,
    pub doc_id: String,
    pub seq: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(doc_id: &str, seq: usize, text: String) -> Self {
        Self {
            chunk_id: format!("{doc_id}_{seq}"),
            doc_id: doc_id.to_string(),
            seq,
            text,
        }
    }
}

pub mod fusion;
pub mod highlight;

pub use fusion::{DEGRADED_GENERIC, DEGRADED_RATE_LIMIT, DEGRADED_TOO_LONG, NOT_IN_CONTEXT};
pub use highlight::{highlight_nodes, normalize};

use serde::{Deserialize, Serialize};
use tracing::warn;

use extract::KnowledgeGraph;
use index::{DEFAULT_TOP_K, RetrievalIndex, VectorBackend};
use llm::{ChatMessage, CompletionOptions, LlmClient, RateLimitSnapshot};

/// Result of one chat turn. Always well-formed: a failed gateway call
/// produces a degraded response string and default rate-limit info, never
/// an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub response: String,
    pub sources: Vec<String>,
    pub highlighted_nodes: Vec<String>,
    pub rate_limits: RateLimitSnapshot,
}

/// Fuses graph context with retrieved chunks and asks the gateway for an
/// answer, then selects which graph nodes the answer mentions.
#[derive(Clone)]
pub struct ChatEngine {
    llm: LlmClient,
    model: String,
    top_k: usize,
}

impl ChatEngine {
    pub fn new(llm: LlmClient, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Answer `question` from the session's graph and retrieval index.
    ///
    /// Never fails past this boundary: retrieval errors degrade to an
    /// empty source list, gateway errors to a fixed apology string.
    /// Highlighting runs on whatever answer text ends up being shown.
    pub async fn answer<B: VectorBackend>(
        &self,
        question: &str,
        graph: &KnowledgeGraph,
        retrieval: &RetrievalIndex<B>,
    ) -> ChatOutcome {
        let sources = match retrieval.query(question, self.top_k).await {
            Ok(chunks) => chunks,
            Err(error) => {
                warn!(%error, "retrieval failed, answering without excerpts");
                Vec::new()
            }
        };

        let context = fusion::build_context(&graph.edges_as_context(), &sources);
        let messages = [
            ChatMessage::system(fusion::system_instruction()),
            ChatMessage::user(fusion::user_prompt(&context, question)),
        ];
        let options = CompletionOptions {
            model: self.model.clone(),
            ..Default::default()
        };

        let (response, rate_limits) = match self.llm.complete(&messages, &options).await {
            Ok(completion) => (completion.text, completion.rate_limits),
            Err(error) => {
                warn!(%error, "chat completion failed, degrading");
                (fusion::degraded_response(&error), RateLimitSnapshot::default())
            }
        };

        let highlighted_nodes = highlight::highlight_nodes(&response, graph.node_ids());

        ChatOutcome {
            response,
            sources,
            highlighted_nodes,
            rate_limits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index::{ChunkerConfig, InMemoryBackend};
    use llm::{LlmConfig, RateLimitStore};

    fn unreachable_engine() -> ChatEngine {
        // Nothing listens on port 9; every call fails at the transport.
        let config = LlmConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            api_key: "test-key".to_string(),
            timeout_secs: 1,
        };
        ChatEngine::new(
            LlmClient::new(config, RateLimitStore::new()),
            "gpt-4o-mini",
        )
    }

    #[tokio::test]
    async fn empty_session_still_gets_a_response() {
        let engine = unreachable_engine();
        let graph = KnowledgeGraph::new();
        let retrieval = RetrievalIndex::new(InMemoryBackend::new(), ChunkerConfig::default());

        let outcome = engine.answer("what is this?", &graph, &retrieval).await;

        assert_eq!(outcome.response, DEGRADED_GENERIC);
        assert!(outcome.sources.is_empty());
        assert!(outcome.highlighted_nodes.is_empty());
        assert_eq!(outcome.rate_limits, RateLimitSnapshot::default());
    }

    #[tokio::test]
    async fn degraded_answer_still_carries_sources() {
        let engine = unreachable_engine();
        let graph = KnowledgeGraph::new();
        let retrieval = RetrievalIndex::new(InMemoryBackend::new(), ChunkerConfig::default());
        retrieval
            .index_document("ferrets are small mustelids", "doc")
            .await
            .unwrap();

        let outcome = engine.answer("ferrets", &graph, &retrieval).await;

        assert_eq!(outcome.sources.len(), 1);
        assert_eq!(outcome.response, DEGRADED_GENERIC);
    }
}

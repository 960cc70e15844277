pub mod graph;
pub mod parser;
pub mod prompt;
pub mod schema;

pub use graph::{GraphData, GraphLink, GraphNode, KnowledgeGraph, ROOT_NODE};
pub use schema::Triple;

use thiserror::Error;
use tracing::{info, warn};

use llm::{ChatMessage, CompletionOptions, LlmClient, LlmError, RateLimitSnapshot};

/// Extraction reads at most this many characters; longer documents
/// contribute only their prefix.
pub const MAX_INPUT_CHARS: usize = 60_000;

const EXTRACTION_MAX_TOKENS: u32 = 14_000;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("could not find valid JSON in model response")]
    MalformedResponse,
}

/// A completed extraction: the accepted triples, the graph assembled from
/// them, and the quota telemetry observed on the call.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub triples: Vec<Triple>,
    pub graph: KnowledgeGraph,
    pub rate_limits: RateLimitSnapshot,
}

/// Soft minimum of relationships to ask the model for: one more per 500
/// characters on top of a base of 20, capped at 80 to prevent graph
/// explosions on large documents.
pub fn relationship_target(char_count: usize) -> usize {
    (20 + char_count / 500).min(80)
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_offset, _)) => &text[..byte_offset],
        None => text,
    }
}

/// Turns unstructured model output into a consistent node/edge structure.
///
/// Stateless: each call builds a complete graph which the caller swaps in
/// wholesale, so no partial graph is ever observable.
#[derive(Clone)]
pub struct GraphExtractor {
    llm: LlmClient,
    model: String,
}

impl GraphExtractor {
    pub fn new(llm: LlmClient, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Extract a knowledge graph from `text`.
    ///
    /// Gateway failures propagate unchanged; there is no fallback text to
    /// show at this layer. Malformed individual triples are dropped, never
    /// escalated. An empty triple list is a valid outcome: the result then
    /// carries an empty graph.
    pub async fn extract(&self, text: &str) -> Result<Extraction, ExtractError> {
        let input = truncate_chars(text, MAX_INPUT_CHARS);
        let char_count = input.chars().count();
        let target = relationship_target(char_count);

        info!(chars = char_count, target, "extracting knowledge graph");

        let messages = [
            ChatMessage::system("You are a JSON-speaking API."),
            ChatMessage::user(prompt::extraction_prompt(input, target)),
        ];
        let options = CompletionOptions {
            model: self.model.clone(),
            max_tokens: EXTRACTION_MAX_TOKENS,
            json_mode: true,
            ..Default::default()
        };

        let completion = self.llm.complete(&messages, &options).await?;
        let rate_limits = completion.rate_limits;

        let raw_items = parser::parse_triples(&completion.text)?;
        if raw_items.is_empty() {
            warn!("model returned an empty triples list");
            return Ok(Extraction {
                triples: Vec::new(),
                graph: KnowledgeGraph::new(),
                rate_limits,
            });
        }

        let triples = schema::validate_triples(raw_items);
        let graph = KnowledgeGraph::assemble(&triples);

        info!(
            triples = triples.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "graph assembled"
        );

        Ok(Extraction {
            triples,
            graph,
            rate_limits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_scales_with_length_and_clamps() {
        assert_eq!(relationship_target(0), 20);
        assert_eq!(relationship_target(499), 20);
        assert_eq!(relationship_target(5_000), 30);
        assert_eq!(relationship_target(30_000), 80);
        assert_eq!(relationship_target(100_000), 80);
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let text = "é".repeat(10);
        assert_eq!(truncate_chars(&text, 4).chars().count(), 4);
        assert_eq!(truncate_chars(&text, 10), text.as_str());
        assert_eq!(truncate_chars(&text, 11), text.as_str());
    }

    #[test]
    fn truncation_is_noop_for_short_text() {
        assert_eq!(truncate_chars("short", MAX_INPUT_CHARS), "short");
    }
}

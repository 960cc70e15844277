use llm::LlmError;

/// Sentence the model is told to emit when the context has no answer.
pub const NOT_IN_CONTEXT: &str = "This information is not available in the uploaded document.";

pub const DEGRADED_TOO_LONG: &str =
    "The question or context is too long for the model's context window. Please try shortening your query.";
pub const DEGRADED_RATE_LIMIT: &str =
    "API rate limit reached. Please wait a moment and try again.";
pub const DEGRADED_GENERIC: &str =
    "I encountered a technical issue while processing your request. Please try again.";

pub fn system_instruction() -> String {
    format!(
        "You are a helpful assistant for a Knowledge Graph application. \
         Use BOTH the 'Graph Relationships' and 'Document Excerpts' to answer. \
         If the answer is NOT in the provided context, simply say '{NOT_IN_CONTEXT}'"
    )
}

/// Merge graph-derived relationship text with retrieved chunks into one
/// context block. The graph part is an empty string when the graph has no
/// edges, which leaves just the excerpts heading.
pub fn build_context(graph_context: &str, chunks: &[String]) -> String {
    format!(
        "{graph_context}\n\nDocument Excerpts:\n{}",
        chunks.join("\n")
    )
}

pub fn user_prompt(context: &str, question: &str) -> String {
    format!(
        "Context:\n{context}\n\nUser Question: {question}\n\n\
         Answer ONLY using the information above. If the answer is not found, say so clearly."
    )
}

/// A chat turn must always produce some answer; gateway failures collapse
/// to one of three fixed strings.
pub fn degraded_response(error: &LlmError) -> String {
    match error {
        LlmError::RateLimited { .. } => DEGRADED_RATE_LIMIT.to_string(),
        LlmError::Gateway { status: 413, .. } => DEGRADED_TOO_LONG.to_string(),
        LlmError::Gateway { body, .. } if body.contains("Payload Too Large") => {
            DEGRADED_TOO_LONG.to_string()
        }
        _ => DEGRADED_GENERIC.to_string(),
    }
}

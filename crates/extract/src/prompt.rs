/// Prompt asking the model for a schema-free knowledge graph.
///
/// `relationship_target` is a soft minimum: the model is told to stop short
/// rather than hallucinate when the content is sparse.
pub fn extraction_prompt(text: &str, relationship_target: usize) -> String {
    format!(
        r#"Extract a COMPREHENSIVE knowledge graph from the text below.
Return a JSON object with a list of triples.

CRITICAL INSTRUCTION: Analyze the document content to determine its Domain (e.g., Legal, Scientific, Narrative, Technical, etc.).

Dynamically create a hierarchical structure that best fits the content.
Do NOT force a specific schema. Instead, invent categories that make sense for this specific text.

General logic for ANY document:
1. SCAN: identify all key entities first (People, Organizations, Dates, Locations, Events, Concepts).
2. CATEGORIZE: group these entities into logical high-level themes (e.g., "Experience", "Methodology", "Findings").
3. LINK: create hierarchical connections from Document -> Category -> Entity -> Details.

CRITICAL: ensure "Who", "What", "When", and "Where" are covered.

Example (abstract):
- "Document" -> "Category A (e.g. Findings)" -> "Item 1"
- "Item 1" -> "Detail X" -> "Value"
- "Document" -> "Category B (e.g. Methodology)" -> "Process Z"

Format: {{ "triples": [ {{"source": "Parent Node", "target": "Child Node", "relation": "relationship"}} ] }}
Target: Extract at least {relationship_target} relationships. If the content is sparse and you cannot reach this target, extract as many meaningful relationships as possible without hallucinating.

Text:
{text}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_target_and_text() {
        let prompt = extraction_prompt("The quick brown fox.", 20);
        assert!(prompt.contains("at least 20 relationships"));
        assert!(prompt.contains("The quick brown fox."));
        assert!(prompt.contains(r#""triples""#));
    }
}

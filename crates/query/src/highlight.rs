//! Evidence highlighting: decide which graph nodes an answer "mentions".
//!
//! Pure functions over (node id, answer text). The matching is a heuristic
//! with expected false positives and negatives; it is deterministic for
//! identical inputs, and the rule thresholds below are covered by tests.

use std::collections::HashSet;

/// Lowercase, strip `*` emphasis markers, drop everything that is neither
/// alphanumeric nor whitespace.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .replace('*', "")
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

fn mentioned(node_id: &str, answer_lower: &str, answer_normalized: &str) -> bool {
    // Rule 1: direct substring, for ids long enough to be distinctive.
    let clean_node = node_id.to_lowercase();
    let clean_node = clean_node.trim();
    if clean_node.chars().count() > 3 && answer_lower.contains(clean_node) {
        return true;
    }

    // Rule 2: at least half of the node's distinct tokens appear. Tokens of
    // one or two characters are too noisy to count as hits, but still count
    // against the denominator.
    let normalized = normalize(node_id);
    let tokens: HashSet<&str> = normalized.split_whitespace().collect();
    if tokens.is_empty() {
        return false;
    }

    let matched = tokens
        .iter()
        .filter(|t| t.chars().count() > 2 && answer_normalized.contains(**t))
        .count();

    matched as f64 / tokens.len() as f64 >= 0.5
}

/// Node ids judged mentioned in `answer`, in the order given.
pub fn highlight_nodes<'a>(
    answer: &str,
    node_ids: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let answer_lower = answer.to_lowercase();
    let answer_normalized = normalize(answer);

    node_ids
        .into_iter()
        .filter(|id| mentioned(id, &answer_lower, &answer_normalized))
        .map(str::to_string)
        .collect()
}

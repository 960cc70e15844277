use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One extracted fact: source --relation--> target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Triple {
    pub source: String,
    pub target: String,
    pub relation: String,
}

/// Keep the items that are well-formed triples, drop the rest.
///
/// A model-produced item is accepted iff it is an object with string
/// `source`, `target` and `relation` fields and non-empty source/target.
/// Malformed items are skipped silently; they never fail the extraction.
pub fn validate_triples(items: Vec<Value>) -> Vec<Triple> {
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Triple>(item).ok())
        .filter(|t| !t.source.is_empty() && !t.target.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_well_formed_triples() {
        let items = vec![json!({"source": "A", "target": "B", "relation": "knows"})];
        let triples = validate_triples(items);
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].relation, "knows");
    }

    #[test]
    fn drops_missing_fields_and_empty_endpoints() {
        let items = vec![
            json!({"source": "A", "target": "B"}),                        // no relation
            json!({"source": "", "target": "B", "relation": "r"}),        // empty source
            json!({"source": "A", "target": "", "relation": "r"}),        // empty target
            json!({"target": "B", "relation": "r"}),                      // no source
            json!("not an object"),
            json!(42),
            json!({"source": "A", "target": "B", "relation": "ok"}),
        ];
        let triples = validate_triples(items);
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].relation, "ok");
    }

    #[test]
    fn empty_relation_is_still_accepted() {
        // Only source/target emptiness disqualifies an item.
        let items = vec![json!({"source": "A", "target": "B", "relation": ""})];
        assert_eq!(validate_triples(items).len(), 1);
    }

    #[test]
    fn non_string_fields_are_dropped() {
        let items = vec![json!({"source": 1, "target": "B", "relation": "r"})];
        assert!(validate_triples(items).is_empty());
    }
}

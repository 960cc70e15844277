use std::collections::{HashMap, HashSet};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::schema::Triple;

/// Identifier of the single root node every assembled graph carries.
pub const ROOT_NODE: &str = "Document";

const ROOT_GROUP: u8 = 0;
const ENTITY_GROUP: u8 = 1;

#[derive(Debug, Clone)]
struct NodeData {
    id: String,
    group: u8,
}

/// Wire shape consumed by the front end: `{nodes, links}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub group: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub label: String,
}

/// Undirected multigraph of extracted entities.
///
/// Node identifiers are the raw entity strings, case-sensitive and
/// untrimmed. Parallel edges between the same pair are kept when their
/// labels differ; exact (pair, label) duplicates collapse to one edge.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: UnGraph<NodeData, String>,
    lookup: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    /// An empty graph: no nodes, not even the root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh graph from accepted triples.
    ///
    /// The root node is always present. For every triple, the
    /// source—target edge is added with the relation as its label, and a
    /// Document—source edge labeled "contains" is added regardless of
    /// whether the source is already reachable from the root. Downstream
    /// rendering relies on those extra root edges, so they are kept even
    /// for deeply nested children.
    pub fn assemble(triples: &[Triple]) -> Self {
        let mut kg = Self::new();
        let mut seen_edges: HashSet<(NodeIndex, NodeIndex, String)> = HashSet::new();

        let root = kg.ensure_node(ROOT_NODE);

        for triple in triples {
            let source = kg.ensure_node(&triple.source);
            let target = kg.ensure_node(&triple.target);

            kg.add_edge_once(&mut seen_edges, source, target, &triple.relation);
            kg.add_edge_once(&mut seen_edges, root, source, "contains");
        }

        kg
    }

    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&index) = self.lookup.get(id) {
            return index;
        }
        let group = if id == ROOT_NODE { ROOT_GROUP } else { ENTITY_GROUP };
        let index = self.graph.add_node(NodeData {
            id: id.to_string(),
            group,
        });
        self.lookup.insert(id.to_string(), index);
        index
    }

    fn add_edge_once(
        &mut self,
        seen: &mut HashSet<(NodeIndex, NodeIndex, String)>,
        a: NodeIndex,
        b: NodeIndex,
        label: &str,
    ) {
        // Normalize the endpoint order so undirected duplicates collapse.
        let key = if a.index() <= b.index() {
            (a, b, label.to_string())
        } else {
            (b, a, label.to_string())
        };
        if seen.insert(key) {
            self.graph.add_edge(a, b, label.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.lookup.clear();
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(|n| n.id.as_str())
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.lookup.contains_key(id)
    }

    /// Labels of all edges between two nodes, in insertion order.
    pub fn edge_labels(&self, a: &str, b: &str) -> Vec<&str> {
        let (Some(&a), Some(&b)) = (self.lookup.get(a), self.lookup.get(b)) else {
            return Vec::new();
        };
        self.graph
            .edge_references()
            .filter(|e| {
                (e.source() == a && e.target() == b) || (e.source() == b && e.target() == a)
            })
            .map(|e| e.weight().as_str())
            .collect()
    }

    /// Export as the `{nodes, links}` shape the front end renders.
    pub fn graph_data(&self) -> GraphData {
        let nodes = self
            .graph
            .node_weights()
            .map(|n| GraphNode {
                id: n.id.clone(),
                group: n.group,
            })
            .collect();

        let links = self
            .graph
            .edge_references()
            .map(|e| GraphLink {
                source: self.graph[e.source()].id.clone(),
                target: self.graph[e.target()].id.clone(),
                label: e.weight().clone(),
            })
            .collect();

        GraphData { nodes, links }
    }

    /// Render the relationships as context lines for the chat prompt.
    ///
    /// Empty string when the graph has no edges, so the fusion step can
    /// concatenate it unconditionally.
    pub fn edges_as_context(&self) -> String {
        if self.graph.edge_count() == 0 {
            return String::new();
        }

        let mut text = String::from("Extracted Knowledge Graph Relationships:\n");
        for edge in self.graph.edge_references() {
            let source = &self.graph[edge.source()].id;
            let target = &self.graph[edge.target()].id;
            text.push_str(&format!("- {} [{}] {}\n", source, edge.weight(), target));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(source: &str, target: &str, relation: &str) -> Triple {
        Triple {
            source: source.to_string(),
            target: target.to_string(),
            relation: relation.to_string(),
        }
    }

    #[test]
    fn assembled_graph_has_exactly_one_root() {
        let kg = KnowledgeGraph::assemble(&[
            triple("A", "B", "r1"),
            triple("B", "C", "r2"),
        ]);
        let data = kg.graph_data();
        let roots: Vec<_> = data.nodes.iter().filter(|n| n.group == 0).collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, ROOT_NODE);
    }

    #[test]
    fn every_source_gets_a_contains_edge_from_root() {
        let kg = KnowledgeGraph::assemble(&[
            triple("A", "B", "r1"),
            triple("B", "C", "r2"), // B is already connected, still gets one
        ]);
        assert_eq!(kg.edge_labels(ROOT_NODE, "A"), vec!["contains"]);
        assert_eq!(kg.edge_labels(ROOT_NODE, "B"), vec!["contains"]);
        // C is only ever a target, no root edge.
        assert!(kg.edge_labels(ROOT_NODE, "C").is_empty());
    }

    #[test]
    fn self_loop_when_source_equals_target() {
        let kg = KnowledgeGraph::assemble(&[triple("A", "A", "is")]);
        assert_eq!(kg.edge_labels("A", "A"), vec!["is"]);
        assert_eq!(kg.edge_labels(ROOT_NODE, "A"), vec!["contains"]);
    }

    #[test]
    fn parallel_edges_with_distinct_labels_are_kept() {
        let kg = KnowledgeGraph::assemble(&[
            triple("A", "B", "founded"),
            triple("A", "B", "leads"),
            triple("A", "B", "founded"), // exact duplicate collapses
        ]);
        let mut labels = kg.edge_labels("A", "B");
        labels.sort();
        assert_eq!(labels, vec!["founded", "leads"]);
    }

    #[test]
    fn triple_mentioning_document_reuses_the_root() {
        let kg = KnowledgeGraph::assemble(&[triple(ROOT_NODE, "A", "covers")]);
        let data = kg.graph_data();
        assert_eq!(
            data.nodes.iter().filter(|n| n.id == ROOT_NODE).count(),
            1
        );
        assert_eq!(data.nodes.iter().find(|n| n.id == ROOT_NODE).unwrap().group, 0);
        // Document -> A via "covers" and the contains self-loop on Document.
        let mut labels = kg.edge_labels(ROOT_NODE, "A");
        labels.sort();
        assert_eq!(labels, vec!["covers"]);
        assert_eq!(kg.edge_labels(ROOT_NODE, ROOT_NODE), vec!["contains"]);
    }

    #[test]
    fn node_identity_is_case_sensitive_and_untrimmed() {
        let kg = KnowledgeGraph::assemble(&[triple("Apple", "apple ", "differs")]);
        assert!(kg.contains_node("Apple"));
        assert!(kg.contains_node("apple "));
        assert_eq!(kg.node_count(), 3); // root + both variants
    }

    #[test]
    fn context_rendering_matches_line_format() {
        let kg = KnowledgeGraph::assemble(&[triple("A", "B", "knows")]);
        let text = kg.edges_as_context();
        assert!(text.starts_with("Extracted Knowledge Graph Relationships:\n"));
        assert!(text.contains("- A [knows] B\n"));
        assert!(text.contains("- Document [contains] A\n"));
    }

    #[test]
    fn empty_graph_renders_empty_context() {
        assert_eq!(KnowledgeGraph::new().edges_as_context(), "");
        // A graph with nodes but no edges also renders empty.
        let kg = KnowledgeGraph::assemble(&[]);
        assert_eq!(kg.edges_as_context(), "");
    }

    #[test]
    fn clear_empties_the_graph() {
        let mut kg = KnowledgeGraph::assemble(&[triple("A", "B", "r")]);
        kg.clear();
        assert!(kg.is_empty());
        assert_eq!(kg.edge_count(), 0);
        assert!(!kg.contains_node(ROOT_NODE));
    }
}

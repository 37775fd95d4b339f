//! Lenient node-label extraction.
//!
//! Unlike the parser this never fails: it scans for `ID[Label]` pairs, so it
//! can list subtopics from partial text while a stream is still arriving.

use super::model::NodeRef;
use once_cell::sync::Lazy;
use regex::Regex;

static NODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9_]+)\s*\[([^\]]+)\]").expect("node pattern is a valid regex")
});

/// Extracts `ID[Label]` pairs in first-seen order.
///
/// A later occurrence of the same id overrides the label but keeps the
/// original position. Labels are trimmed.
pub fn extract_node_labels(text: &str) -> Vec<NodeRef> {
    let mut nodes: Vec<NodeRef> = Vec::new();

    for caps in NODE_PATTERN.captures_iter(text) {
        let id = &caps[1];
        let label = caps[2].trim().to_string();

        match nodes.iter_mut().find(|node| node.id == id) {
            Some(existing) => existing.label = label,
            None => nodes.push(NodeRef {
                id: id.to_string(),
                label,
            }),
        }
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_in_order() {
        let text = "graph TD\nA[ Intro ] --> B[Cells]\nB --> C[Nucleus]";
        let nodes = extract_node_labels(text);
        let ids: Vec<_> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["A", "B", "C"]);
        assert_eq!(nodes[0].label, "Intro");
    }

    #[test]
    fn test_later_occurrence_overrides_label() {
        let nodes = extract_node_labels("A[First] --> B[Two]\nA[Second]");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].label, "Second");
    }

    #[test]
    fn test_partial_text_is_fine() {
        let nodes = extract_node_labels("graph TD\nA[Complete] --> B[Incompl");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "A");
    }
}

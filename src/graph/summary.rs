//! Summary statistics for an assembled graph.

use serde::Serialize;
use std::collections::HashSet;

use super::CitationGraph;

/// Counts describing an assembled citation graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    /// Total number of nodes
    pub nodes: usize,

    /// Nodes that came from the seed list
    pub seeds: usize,

    /// Nodes discovered through citations or references
    pub discovered: usize,

    /// Total number of edges, duplicates included
    pub edges: usize,

    /// Number of distinct (source, target) pairs
    pub distinct_edges: usize,

    /// Seed DOIs that ended up without any edge
    pub isolated_seeds: Vec<String>,

    /// Nodes still carrying the placeholder title
    pub untitled: usize,
}

impl GraphSummary {
    /// Compute the summary of `graph`
    pub fn of(graph: &CitationGraph) -> Self {
        let mut connected = HashSet::new();
        let mut distinct = HashSet::new();
        for edge in graph.edges() {
            connected.insert(edge.source);
            connected.insert(edge.target);
            distinct.insert(edge);
        }

        let seeds = graph.nodes().filter(|(_, work)| work.is_seed).count();

        let isolated_seeds = graph
            .nodes()
            .filter(|(id, work)| work.is_seed && !connected.contains(id))
            .map(|(_, work)| work.doi.clone())
            .collect();

        Self {
            nodes: graph.node_count(),
            seeds,
            discovered: graph.node_count() - seeds,
            edges: graph.edge_count(),
            distinct_edges: distinct.len(),
            isolated_seeds,
            untitled: graph
                .nodes()
                .filter(|(_, work)| work.has_unknown_title())
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::assemble;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_summary_counts() {
        let seeds = vec!["A".to_string(), "Lonely".to_string()];
        let relation = json!({ "citing": "doi:10.1000/B" });
        let citations: HashMap<String, Vec<_>> =
            HashMap::from([("A".to_string(), vec![relation.clone(), relation])]);
        let metadata = HashMap::from([("A".to_string(), vec![json!({ "title": "Seed A" })])]);

        let (graph, _) = assemble(&seeds, &metadata, &citations, &HashMap::new());
        let summary = GraphSummary::of(&graph);

        assert_eq!(summary.nodes, 3);
        assert_eq!(summary.seeds, 2);
        assert_eq!(summary.discovered, 1);
        assert_eq!(summary.edges, 2);
        assert_eq!(summary.distinct_edges, 1);
        assert_eq!(summary.isolated_seeds, vec!["Lonely".to_string()]);
        assert_eq!(summary.untitled, 2);
    }
}

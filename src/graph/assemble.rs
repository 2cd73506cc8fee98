//! Graph assembly from loaded records.

use serde_json::Value;

use super::{CitationGraph, GraphBuilder, NodeMapping};
use crate::loader::{RecordError, RecordsByDoi};
use crate::models::{RelationRecord, WorkRecord};

/// Build the citation graph for `seeds`.
///
/// Node IDs are assigned in first-encounter order: every seed first, then the
/// citing works of each seed, then the works each seed references. Edges always
/// point from the citing work to the cited one, and repeated relations produce
/// repeated edges. Relations whose DOI can't be extracted are skipped.
///
/// Metadata is normalized lazily, once per DOI, from `metadata`; DOIs without
/// an entry get placeholder attributes. This never fails: missing records just
/// produce a sparser graph.
pub fn assemble(
    seeds: &[String],
    metadata: &RecordsByDoi,
    citations: &RecordsByDoi,
    references: &RecordsByDoi,
) -> (CitationGraph, NodeMapping) {
    let mut builder = GraphBuilder::new();

    let work_for = |doi: &str, is_seed: bool| {
        let records = metadata.get(doi).map(Vec::as_slice).unwrap_or_default();
        WorkRecord::normalize(records, doi, is_seed)
    };

    for seed in seeds {
        builder.intern(seed, || work_for(seed, true));
    }

    for seed in seeds {
        for raw in relations_of(citations, seed) {
            let Some(relation) = RelationRecord::incoming(raw, seed) else {
                log_unresolvable(raw, "citing");
                continue;
            };

            let citing = builder.intern(&relation.citing, || work_for(&relation.citing, false));
            let cited = builder.intern(&relation.cited, || work_for(&relation.cited, true));
            builder.connect(citing, cited);
        }
    }

    for seed in seeds {
        for raw in relations_of(references, seed) {
            let Some(relation) = RelationRecord::outgoing(raw, seed) else {
                log_unresolvable(raw, "cited");
                continue;
            };

            let citing = builder.intern(&relation.citing, || work_for(&relation.citing, true));
            let cited = builder.intern(&relation.cited, || work_for(&relation.cited, false));
            builder.connect(citing, cited);
        }
    }

    let (graph, mapping) = builder.finish();
    tracing::info!(
        "Assembled citation graph: {} nodes, {} edges from {} seeds",
        graph.node_count(),
        graph.edge_count(),
        seeds.len()
    );

    (graph, mapping)
}

fn relations_of<'a>(relations: &'a RecordsByDoi, seed: &str) -> &'a [Value] {
    relations.get(seed).map(Vec::as_slice).unwrap_or_default()
}

fn log_unresolvable(raw: &Value, field: &'static str) {
    let value = raw
        .get(field)
        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
        .unwrap_or_default();
    tracing::debug!("Skipping relation: {}", RecordError::UnresolvableIdentifier { field, value });
}

//! Node and edge CSV tables (Gephi spreadsheet import format).

use super::ExportError;
use crate::graph::{CitationGraph, NodeMapping};

/// Header of the node table
pub const NODE_HEADERS: [&str; 8] = ["Id", "Label", "Authors", "Venue", "Type", "Year", "DOI", "Seed"];

/// Header of the edge table
pub const EDGE_HEADERS: [&str; 2] = ["Source", "Target"];

/// Serialized node and edge tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularExport {
    pub nodes: Vec<u8>,
    pub edges: Vec<u8>,
}

/// Render the node and edge tables.
///
/// Node rows follow ascending node ID, edge rows follow insertion order with
/// duplicates kept. Author lists are joined with `"; "`.
pub fn export_tabular(
    graph: &CitationGraph,
    mapping: &NodeMapping,
) -> Result<TabularExport, ExportError> {
    let mut nodes = csv::Writer::from_writer(Vec::new());
    nodes.write_record(NODE_HEADERS)?;

    for (doi, id) in mapping.iter() {
        let Some(work) = graph.node(id) else {
            tracing::warn!("DOI {} maps to node {} which is not in the graph", doi, id);
            continue;
        };

        let authors = work.authors.to_string();
        nodes.write_record([
            id.to_string().as_str(),
            work.title.as_str(),
            authors.as_str(),
            work.venue.as_str(),
            work.work_type.as_str(),
            work.year.as_str(),
            work.doi.as_str(),
            if work.is_seed { "true" } else { "false" },
        ])?;
    }

    let mut edges = csv::Writer::from_writer(Vec::new());
    edges.write_record(EDGE_HEADERS)?;
    for edge in graph.edges() {
        edges.write_record([edge.source.to_string(), edge.target.to_string()])?;
    }

    Ok(TabularExport {
        nodes: into_bytes(nodes)?,
        edges: into_bytes(edges)?,
    })
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ExportError> {
    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))
}

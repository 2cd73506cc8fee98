//! Graph export to GEXF and CSV.
//!
//! - [`write_gexf`] / [`to_gexf_bytes`]: GEXF 1.2 document for Gephi or networkx
//! - [`export_tabular`]: `nodes.csv` / `edges.csv` tables
//! - [`write_exports`]: both, written into a results directory
//!
//! All exports are deterministic for a given graph.

mod gexf;
mod tabular;

pub use gexf::{to_gexf_bytes, write_gexf};
pub use tabular::{export_tabular, TabularExport, EDGE_HEADERS, NODE_HEADERS};

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::graph::{CitationGraph, NodeMapping};

/// Errors that can occur while exporting a graph
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// XML writing error
    #[error("XML error: {0}")]
    Xml(String),

    /// CSV writing error
    #[error("CSV error: {0}")]
    Csv(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Csv(err.to_string())
    }
}

fn xml_error<E: std::fmt::Display>(err: E) -> ExportError {
    ExportError::Xml(err.to_string())
}

/// File names of the export targets inside the results directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFiles {
    pub gexf: String,
    pub nodes: String,
    pub edges: String,
}

impl Default for ExportFiles {
    fn default() -> Self {
        Self {
            gexf: "citation_graph.gexf".to_string(),
            nodes: "nodes.csv".to_string(),
            edges: "edges.csv".to_string(),
        }
    }
}

/// Paths of the files written by [`write_exports`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub gexf: PathBuf,
    pub nodes: PathBuf,
    pub edges: PathBuf,
}

/// Write the GEXF document and both CSV tables into `dir`
pub fn write_exports(
    graph: &CitationGraph,
    mapping: &NodeMapping,
    dir: &Path,
    files: &ExportFiles,
) -> Result<ExportPaths, ExportError> {
    fs::create_dir_all(dir)?;

    let paths = ExportPaths {
        gexf: dir.join(&files.gexf),
        nodes: dir.join(&files.nodes),
        edges: dir.join(&files.edges),
    };

    write_gexf(graph, BufWriter::new(File::create(&paths.gexf)?))?;
    tracing::info!("Wrote GEXF graph to {}", paths.gexf.display());

    let tables = export_tabular(graph, mapping)?;
    fs::write(&paths.nodes, &tables.nodes)?;
    fs::write(&paths.edges, &tables.edges)?;
    tracing::info!(
        "Wrote {} node rows to {} and {} edge rows to {}",
        graph.node_count(),
        paths.nodes.display(),
        graph.edge_count(),
        paths.edges.display()
    );

    Ok(paths)
}

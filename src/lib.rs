//! # citegraph
//!
//! Builds a directed citation graph around a list of seed DOIs from
//! OpenCitations records, and exports it as GEXF and CSV.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Work records, record kinds and citation relations
//! - [`loader`]: Reading cached payloads into per-DOI record lists
//! - [`graph`]: Node ID assignment and graph assembly
//! - [`export`]: GEXF and CSV writers
//! - [`sources`]: OpenCitations and Crossref clients, and the harvesting loop
//! - [`utils`]: Identifier extraction, HTTP client, retry
//! - [`config`]: Configuration management
//!
//! ## Pipeline
//!
//! ```rust,no_run
//! use citegraph::export::{write_exports, ExportFiles};
//! use citegraph::loader::ResultsDir;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let seeds = vec!["10.3390/app14010192".to_string()];
//! let results = ResultsDir::new("results");
//!
//! let (graph, mapping) = citegraph::build_graph(&results, &seeds);
//! write_exports(&graph, &mapping, results.root(), &ExportFiles::default())?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod export;
pub mod graph;
pub mod loader;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use graph::{CitationGraph, GraphSummary, NodeId, NodeMapping};
pub use loader::{LoadedRecords, RecordStore, ResultsDir};
pub use models::{RecordKind, WorkRecord};
pub use sources::{Fetcher, OpenCitationsClient, SourceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Load every seed's records from `store` and assemble the graph
pub fn build_graph<S>(store: &S, seeds: &[String]) -> (CitationGraph, NodeMapping)
where
    S: RecordStore + ?Sized,
{
    let records = LoadedRecords::load(store, seeds);
    graph::assemble(
        seeds,
        &records.metadata,
        &records.citations,
        &records.references,
    )
}

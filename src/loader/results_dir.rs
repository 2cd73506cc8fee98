//! On-disk results directory holding one JSON file per DOI and record kind.
//!
//! # Layout
//!
//! ```text
//! results/
//!   meta_10.1145_3589334.3645580.json
//!   citations_10.1145_3589334.3645580.json
//!   references_10.1145_3589334.3645580.json
//!   citation_graph.gexf
//!   nodes.csv
//!   edges.csv
//! ```

use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{RecordError, RecordStore};
use crate::models::RecordKind;

/// File name of the cached payload for `doi` and `kind`.
///
/// Slashes in the DOI are replaced by underscores; everything else is kept.
pub fn cache_file_name(doi: &str, kind: RecordKind) -> String {
    format!("{}_{}.json", kind.as_str(), doi.replace('/', "_"))
}

/// A results directory on disk
#[derive(Debug, Clone)]
pub struct ResultsDir {
    root: PathBuf,
}

impl ResultsDir {
    /// Wrap a directory path; nothing is created until [`ResultsDir::initialize`]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory if needed
    pub fn initialize(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root)?;
        tracing::debug!("Results directory ready at: {}", self.root.display());
        Ok(())
    }

    /// Get the directory path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the cached payload for `doi` and `kind`
    pub fn path_for(&self, doi: &str, kind: RecordKind) -> PathBuf {
        self.root.join(cache_file_name(doi, kind))
    }

    /// Whether a payload is cached for `doi` and `kind`
    pub fn contains(&self, doi: &str, kind: RecordKind) -> bool {
        self.path_for(doi, kind).is_file()
    }

    /// Write a payload as pretty-printed JSON, replacing any previous file
    pub fn write(&self, doi: &str, kind: RecordKind, payload: &Value) -> Result<PathBuf, RecordError> {
        let path = self.path_for(doi, kind);
        let content = serde_json::to_string_pretty(payload).map_err(|e| {
            RecordError::MalformedPayload {
                doi: doi.to_string(),
                kind,
                reason: e.to_string(),
            }
        })?;

        fs::write(&path, content)?;
        tracing::debug!("Cached {} payload for DOI {} at {}", kind, doi, path.display());
        Ok(path)
    }
}

impl RecordStore for ResultsDir {
    fn read(&self, doi: &str, kind: RecordKind) -> Result<String, RecordError> {
        match fs::read_to_string(self.path_for(doi, kind)) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(RecordError::MissingSource {
                doi: doi.to_string(),
                kind,
            }),
            Err(e) => Err(RecordError::Io(e)),
        }
    }
}
